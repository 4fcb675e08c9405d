// ledger-core/src/xlsx/cell_ref.rs
//! A1 形式的单元格引用与 0 起始行列号互转

pub fn column_letters(col: u32) -> String {
    let mut n = col + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

pub fn cell_ref(row: u32, col: u32) -> String {
    format!("{}{}", column_letters(col), row + 1)
}

/// 解析 `B12`、`$B$12`，返回 0 起始的 (行, 列)
pub fn parse_cell_ref(text: &str) -> Option<(u32, u32)> {
    let text = text.replace('$', "");
    let split = text.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = text.split_at(split);
    if letters.is_empty() || !letters.bytes().all(|b| b.is_ascii_alphabetic()) {
        return None;
    }

    let mut col: u32 = 0;
    for b in letters.bytes() {
        col = col
            .checked_mul(26)?
            .checked_add(u32::from(b.to_ascii_uppercase() - b'A') + 1)?;
    }
    let row: u32 = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((row - 1, col - 1))
}

/// 把 `<dimension ref>` 扩展到包含给定单元格
pub fn widen_dimension(dimension: &str, row: u32, col: u32) -> Option<String> {
    let (start, end) = match dimension.split_once(':') {
        Some((a, b)) => (parse_cell_ref(a)?, parse_cell_ref(b)?),
        None => {
            let single = parse_cell_ref(dimension)?;
            (single, single)
        }
    };
    let top = start.0.min(row);
    let left = start.1.min(col);
    let bottom = end.0.max(row);
    let right = end.1.max(col);
    if (top, left) == (bottom, right) {
        return Some(cell_ref(top, left));
    }
    Some(format!("{}:{}", cell_ref(top, left), cell_ref(bottom, right)))
}
