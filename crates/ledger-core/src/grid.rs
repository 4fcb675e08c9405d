// ledger-core/src/grid.rs
//! 工作表快照：把单元格统一成去掉首尾空白的文本，行列均从 0 开始

use calamine::{Data, Range};
use chrono::{Duration, NaiveDate};

#[derive(Debug, Clone, Default)]
pub struct SheetGrid {
    pub name: String,
    rows: Vec<Vec<String>>,
}

impl SheetGrid {
    pub fn from_rows<R, C>(name: &str, rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|v| v.as_ref().trim().to_string()).collect())
            .collect();
        Self {
            name: name.to_string(),
            rows,
        }
    }

    /// 从 calamine 读到的区域构建，保留绝对行列位置
    pub fn from_range(name: &str, range: &Range<Data>) -> Self {
        let mut rows: Vec<Vec<String>> = Vec::new();
        if let Some((start_row, start_col)) = range.start() {
            for (r, row) in range.rows().enumerate() {
                let abs_row = start_row as usize + r;
                for (c, cell) in row.iter().enumerate() {
                    let text = data_text(cell);
                    if text.is_empty() {
                        continue;
                    }
                    let abs_col = start_col as usize + c;
                    if rows.len() <= abs_row {
                        rows.resize_with(abs_row + 1, Vec::new);
                    }
                    let line = &mut rows[abs_row];
                    if line.len() <= abs_col {
                        line.resize(abs_col + 1, String::new());
                    }
                    line[abs_col] = text;
                }
            }
        }
        Self {
            name: name.to_string(),
            rows,
        }
    }

    /// 行数（最后一个非空行之后的位置）
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, row: usize) -> &[String] {
        self.rows.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn text(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn is_blank(&self, row: usize, col: usize) -> bool {
        self.text(row, col).is_empty()
    }
}

fn data_text(cell: &Data) -> String {
    let text = match cell {
        Data::String(s) => s.clone(),
        Data::Float(f) => float_text(*f),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => serial_date_text(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        _ => String::new(),
    };
    text.trim().to_string()
}

fn float_text(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

/// 日期型单元格按 `YYYY/MM/DD` 呈现，与表格程序中文环境下的默认显示一致
fn serial_date_text(serial: f64) -> String {
    let Some(base) = NaiveDate::from_ymd_opt(1899, 12, 30) else {
        return float_text(serial);
    };
    base.checked_add_signed(Duration::days(serial.floor() as i64))
        .map(|d| d.format("%Y/%m/%d").to_string())
        .unwrap_or_else(|| float_text(serial))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_range_keeps_absolute_positions() {
        let mut range = Range::new((2, 1), (3, 2));
        range.set_value((2, 1), Data::String(" 序号 ".to_string()));
        range.set_value((3, 2), Data::Float(3.0));

        let grid = SheetGrid::from_range("上级文", &range);
        assert_eq!(grid.height(), 4);
        assert_eq!(grid.text(2, 1), "序号");
        assert_eq!(grid.text(3, 2), "3");
        assert_eq!(grid.text(0, 0), "");
        assert!(grid.is_blank(3, 1));
    }

    #[test]
    fn test_float_and_date_rendering() {
        assert_eq!(float_text(12.0), "12");
        assert_eq!(float_text(1.5), "1.5");
        assert_eq!(serial_date_text(46000.0), "2025/12/09");
    }

    #[test]
    fn test_out_of_range_reads_blank() {
        let grid = SheetGrid::from_rows("x", [["a", "b"]]);
        assert_eq!(grid.text(0, 1), "b");
        assert_eq!(grid.text(0, 5), "");
        assert_eq!(grid.text(9, 0), "");
        assert!(grid.row(9).is_empty());
    }
}
