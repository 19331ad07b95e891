//! Glyph art for the built-in DMD fonts.
//!
//! Each glyph is drawn one string per row: `#` is a fully lit dot, `+` a
//! half-lit dot and `.` an unlit dot. The atlas builder adds one blank
//! column of spacing after every glyph. Lower-case letters are not drawn;
//! they fall back to upper-case at lookup time.

pub(super) type Glyph = (char, &'static [&'static str]);

pub(super) const FONT_5PX: &[Glyph] = &[
    (' ', &["..", "..", "..", "..", ".."]),
    ('!', &["#", "#", "#", ".", "#"]),
    ('"', &["#.#", "#.#", "...", "...", "..."]),
    ('#', &[".#.#.", "#####", ".#.#.", "#####", ".#.#."]),
    ('$', &[".##", "##.", ".#.", ".##", "##."]),
    ('%', &["#.#", "..#", ".#.", "#..", "#.#"]),
    ('&', &[".#.", "#.#", ".#.", "#.#", ".##"]),
    ('\'', &["#", "#", ".", ".", "."]),
    ('(', &[".#", "#.", "#.", "#.", ".#"]),
    (')', &["#.", ".#", ".#", ".#", "#."]),
    ('*', &["...", "#.#", ".#.", "#.#", "..."]),
    ('+', &["...", ".#.", "###", ".#.", "..."]),
    (',', &[".", ".", ".", "#", "#"]),
    ('-', &["...", "...", "###", "...", "..."]),
    ('.', &[".", ".", ".", ".", "#"]),
    ('/', &["..#", "..#", ".#.", "#..", "#.."]),
    ('0', &["###", "#.#", "#.#", "#.#", "###"]),
    ('1', &[".#.", "##.", ".#.", ".#.", "###"]),
    ('2', &["##.", "..#", ".#.", "#..", "###"]),
    ('3', &["##.", "..#", ".#.", "..#", "##."]),
    ('4', &["#.#", "#.#", "###", "..#", "..#"]),
    ('5', &["###", "#..", "##.", "..#", "##."]),
    ('6', &[".##", "#..", "###", "#.#", "###"]),
    ('7', &["###", "..#", ".#.", ".#.", ".#."]),
    ('8', &["###", "#.#", "###", "#.#", "###"]),
    ('9', &["###", "#.#", "###", "..#", "##."]),
    (':', &[".", "#", ".", "#", "."]),
    (';', &[".", "#", ".", "#", "#"]),
    ('<', &["..#", ".#.", "#..", ".#.", "..#"]),
    ('=', &["...", "###", "...", "###", "..."]),
    ('>', &["#..", ".#.", "..#", ".#.", "#.."]),
    ('?', &["##.", "..#", ".#.", "...", ".#."]),
    ('@', &[".##.", "#..#", "#.##", "#...", ".##."]),
    ('A', &[".#.", "#.#", "###", "#.#", "#.#"]),
    ('B', &["##.", "#.#", "##.", "#.#", "##."]),
    ('C', &[".##", "#..", "#..", "#..", ".##"]),
    ('D', &["##.", "#.#", "#.#", "#.#", "##."]),
    ('E', &["###", "#..", "##.", "#..", "###"]),
    ('F', &["###", "#..", "##.", "#..", "#.."]),
    ('G', &[".##", "#..", "#.#", "#.#", ".##"]),
    ('H', &["#.#", "#.#", "###", "#.#", "#.#"]),
    ('I', &["###", ".#.", ".#.", ".#.", "###"]),
    ('J', &["..#", "..#", "..#", "#.#", ".#."]),
    ('K', &["#.#", "#.#", "##.", "#.#", "#.#"]),
    ('L', &["#..", "#..", "#..", "#..", "###"]),
    ('M', &["#...#", "##.##", "#.#.#", "#...#", "#...#"]),
    ('N', &["#..#", "##.#", "#.##", "#..#", "#..#"]),
    ('O', &[".#.", "#.#", "#.#", "#.#", ".#."]),
    ('P', &["##.", "#.#", "##.", "#..", "#.."]),
    ('Q', &[".#.", "#.#", "#.#", "##.", ".##"]),
    ('R', &["##.", "#.#", "##.", "#.#", "#.#"]),
    ('S', &[".##", "#..", ".#.", "..#", "##."]),
    ('T', &["###", ".#.", ".#.", ".#.", ".#."]),
    ('U', &["#.#", "#.#", "#.#", "#.#", "###"]),
    ('V', &["#.#", "#.#", "#.#", "#.#", ".#."]),
    ('W', &["#...#", "#...#", "#.#.#", "##.##", "#...#"]),
    ('X', &["#.#", "#.#", ".#.", "#.#", "#.#"]),
    ('Y', &["#.#", "#.#", ".#.", ".#.", ".#."]),
    ('Z', &["###", "..#", ".#.", "#..", "###"]),
    ('[', &["##", "#.", "#.", "#.", "##"]),
    (']', &["##", ".#", ".#", ".#", "##"]),
    ('_', &["...", "...", "...", "...", "###"]),
];

pub(super) const FONT_7PX: &[Glyph] = &[
    (' ', &["...", "...", "...", "...", "...", "...", "..."]),
    ('!', &["#", "#", "#", "#", "#", ".", "#"]),
    ('"', &["#.#", "#.#", "#.#", "...", "...", "...", "..."]),
    ('#', &[".#.#.", ".#.#.", "#####", ".#.#.", "#####", ".#.#.", ".#.#."]),
    ('$', &["..#..", ".####", "#.#..", ".###.", "..#.#", "####.", "..#.."]),
    ('%', &["##...", "##..#", "...#.", "..#..", ".#...", "#..##", "...##"]),
    ('&', &[".##..", "#..#.", "#.#..", ".#...", "#.#.#", "#..#.", ".##.#"]),
    ('\'', &["#", "#", "#", ".", ".", ".", "."]),
    ('(', &["..#", ".#.", "#..", "#..", "#..", ".#.", "..#"]),
    (')', &["#..", ".#.", "..#", "..#", "..#", ".#.", "#.."]),
    ('*', &[".....", "..#..", "#.#.#", ".###.", "#.#.#", "..#..", "....."]),
    ('+', &[".....", "..#..", "..#..", "#####", "..#..", "..#..", "....."]),
    (',', &["..", "..", "..", "..", ".#", ".#", "#."]),
    ('-', &[".....", ".....", ".....", "#####", ".....", ".....", "....."]),
    ('.', &[".", ".", ".", ".", ".", ".", "#"]),
    ('/', &[".....", "....#", "...#.", "..#..", ".#...", "#....", "....."]),
    ('0', &[".###.", "#...#", "#..##", "#.#.#", "##..#", "#...#", ".###."]),
    ('1', &["..#..", ".##..", "..#..", "..#..", "..#..", "..#..", ".###."]),
    ('2', &[".###.", "#...#", "....#", "...#.", "..#..", ".#...", "#####"]),
    ('3', &["#####", "...#.", "..#..", "...#.", "....#", "#...#", ".###."]),
    ('4', &["...#.", "..##.", ".#.#.", "#..#.", "#####", "...#.", "...#."]),
    ('5', &["#####", "#....", "####.", "....#", "....#", "#...#", ".###."]),
    ('6', &["..##.", ".#...", "#....", "####.", "#...#", "#...#", ".###."]),
    ('7', &["#####", "....#", "...#.", "..#..", ".#...", ".#...", ".#..."]),
    ('8', &[".###.", "#...#", "#...#", ".###.", "#...#", "#...#", ".###."]),
    ('9', &[".###.", "#...#", "#...#", ".####", "....#", "...#.", ".##.."]),
    (':', &[".", ".", "#", ".", "#", ".", "."]),
    (';', &["..", "..", ".#", "..", ".#", ".#", "#."]),
    ('<', &["...#", "..#.", ".#..", "#...", ".#..", "..#.", "...#"]),
    ('=', &[".....", ".....", "#####", ".....", "#####", ".....", "....."]),
    ('>', &["#...", ".#..", "..#.", "...#", "..#.", ".#..", "#..."]),
    ('?', &[".###.", "#...#", "....#", "...#.", "..#..", ".....", "..#.."]),
    ('@', &[".###.", "#...#", "....#", ".##.#", "#.#.#", "#.#.#", ".###."]),
    ('A', &[".###.", "#...#", "#...#", "#####", "#...#", "#...#", "#...#"]),
    ('B', &["####.", "#...#", "#...#", "####.", "#...#", "#...#", "####."]),
    ('C', &[".###.", "#...#", "#....", "#....", "#....", "#...#", ".###."]),
    ('D', &["####.", "#...#", "#...#", "#...#", "#...#", "#...#", "####."]),
    ('E', &["#####", "#....", "#....", "####.", "#....", "#....", "#####"]),
    ('F', &["#####", "#....", "#....", "####.", "#....", "#....", "#...."]),
    ('G', &[".###.", "#...#", "#....", "#.###", "#...#", "#...#", ".####"]),
    ('H', &["#...#", "#...#", "#...#", "#####", "#...#", "#...#", "#...#"]),
    ('I', &["###", ".#.", ".#.", ".#.", ".#.", ".#.", "###"]),
    ('J', &["..###", "...#.", "...#.", "...#.", "...#.", "#..#.", ".##.."]),
    ('K', &["#...#", "#..#.", "#.#..", "##...", "#.#..", "#..#.", "#...#"]),
    ('L', &["#....", "#....", "#....", "#....", "#....", "#....", "#####"]),
    ('M', &["#...#", "##.##", "#.#.#", "#.#.#", "#...#", "#...#", "#...#"]),
    ('N', &["#...#", "#...#", "##..#", "#.#.#", "#..##", "#...#", "#...#"]),
    ('O', &[".###.", "#...#", "#...#", "#...#", "#...#", "#...#", ".###."]),
    ('P', &["####.", "#...#", "#...#", "####.", "#....", "#....", "#...."]),
    ('Q', &[".###.", "#...#", "#...#", "#...#", "#.#.#", "#..#.", ".##.#"]),
    ('R', &["####.", "#...#", "#...#", "####.", "#.#..", "#..#.", "#...#"]),
    ('S', &[".####", "#....", "#....", ".###.", "....#", "....#", "####."]),
    ('T', &["#####", "..#..", "..#..", "..#..", "..#..", "..#..", "..#.."]),
    ('U', &["#...#", "#...#", "#...#", "#...#", "#...#", "#...#", ".###."]),
    ('V', &["#...#", "#...#", "#...#", "#...#", "#...#", ".#.#.", "..#.."]),
    ('W', &["#...#", "#...#", "#...#", "#.#.#", "#.#.#", "#.#.#", ".#.#."]),
    ('X', &["#...#", "#...#", ".#.#.", "..#..", ".#.#.", "#...#", "#...#"]),
    ('Y', &["#...#", "#...#", ".#.#.", "..#..", "..#..", "..#..", "..#.."]),
    ('Z', &["#####", "....#", "...#.", "..#..", ".#...", "#....", "#####"]),
    ('[', &["##", "#.", "#.", "#.", "#.", "#.", "##"]),
    (']', &["##", ".#", ".#", ".#", ".#", ".#", "##"]),
    ('_', &[".....", ".....", ".....", ".....", ".....", ".....", "#####"]),
];
