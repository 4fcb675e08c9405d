// ledger-core/src/history.rs
//! 历史推断：从已有数据行推断日期格式、下一个序号、自编号和默认传阅方式，
//! 并从文件名中提取文号。

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

use crate::grid::SheetGrid;
use crate::schema::HeaderMap;

/// 公文文号：`xx〔2026〕12号`、`xx【2026】12号`
static RE_DOC_NO_CORNER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([^\s（）()]*?[〔【]\s*20\d{2}\s*[〕】]\s*\d+\s*号)").expect("valid doc number regex")
});

/// 同上，方括号写法：`xx[2026]12号`
static RE_DOC_NO_SQUARE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([^\s（）()]*?\[\s*20\d{2}\s*\]\s*\d+\s*号)").expect("valid doc number regex")
});

/// 括号内以“号”结尾的宽松写法，括号内须含年份
static RE_DOC_NO_PAREN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[（(]([^）)]+号)[)）]").expect("valid doc number regex"));

static RE_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"20\d{2}").expect("valid year regex"));

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

static RE_INFERRED_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z]+)-(\d{4})-(\d+)$").expect("valid identifier regex")
});

/// 收文日期写法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateStyle {
    /// `2026/01/05`
    Slash,
    /// `2026.01.05`
    Dot,
}

/// 数据行范围：表头下一行到最后一行
fn data_rows(grid: &SheetGrid, header: &HeaderMap) -> std::ops::Range<usize> {
    header.first_data_row()..grid.height().max(header.first_data_row())
}

/// 自下而上找到第一个非空的日期单元格，按其分隔符决定格式
pub fn infer_date_style(grid: &SheetGrid, header: &HeaderMap) -> DateStyle {
    data_rows(grid, header)
        .rev()
        .map(|r| grid.text(r, header.date))
        .find(|v| !v.is_empty())
        .map(|v| {
            if v.contains('/') {
                DateStyle::Slash
            } else {
                DateStyle::Dot
            }
        })
        .unwrap_or(DateStyle::Dot)
}

/// 生成收文日期文本。斜杠格式的年份取路径中识别出的年份（取不到则用当年）。
pub fn format_received_date(date: NaiveDate, style: DateStyle, year_full: Option<&str>) -> String {
    match style {
        DateStyle::Slash => {
            let year = year_full
                .map(str::to_string)
                .unwrap_or_else(|| date.year().to_string());
            format!("{}/{:02}/{:02}", year, date.month(), date.day())
        }
        DateStyle::Dot => format!("{}.{:02}.{:02}", date.year(), date.month(), date.day()),
    }
}

/// 序号和自编号的上限，超出的数字视为残留数据
const MAX_COUNTER: u64 = 1 << 53;

fn parse_number(text: &str) -> Option<i64> {
    let value: f64 = text.trim().parse().ok()?;
    (value.is_finite() && value.abs() <= MAX_COUNTER as f64).then_some(value.trunc() as i64)
}

fn parse_counter(digits: &str) -> Option<u64> {
    digits.parse::<u64>().ok().filter(|&n| n <= MAX_COUNTER)
}

/// 下一个序号：全表最大序号 + 1，没有有效序号时为 1。
///
/// 目标行紧挨表头时固定为 1，不受上方残留数字影响。
pub fn next_sequence(grid: &SheetGrid, header: &HeaderMap, target_row: usize) -> i64 {
    if target_row == header.first_data_row() {
        return 1;
    }
    data_rows(grid, header)
        .filter(|&r| r != target_row)
        .filter_map(|r| parse_number(grid.text(r, header.sequence)))
        .max()
        .and_then(|max| max.checked_add(1))
        .unwrap_or(1)
}

/// 按分类前缀生成自编号：`前缀-年份-(最大值+1)`
pub fn generate_identifier(grid: &SheetGrid, header: &HeaderMap, code: &str, year_full: &str) -> String {
    let prefix = format!("{}-{}-", code, year_full);
    let max = data_rows(grid, header)
        .filter_map(|r| {
            let digits = grid.text(r, header.self_id).strip_prefix(prefix.as_str())?;
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            parse_counter(digits)
        })
        .max()
        .unwrap_or(0);
    format!("{}{}", prefix, max.saturating_add(1))
}

/// 早期做法：从表中第一个形如 `ABC-2025-007` 的自编号推断前缀和位数，
/// 同前缀同年份的最大值 + 1，按原位数补零。表中没有可参考的自编号时用 `AUTO`，三位。
pub fn infer_identifier(grid: &SheetGrid, header: &HeaderMap, year_full: &str) -> String {
    let rows = data_rows(grid, header);
    let (prefix, width) = rows
        .clone()
        .find_map(|r| {
            let caps = RE_INFERRED_ID.captures(grid.text(r, header.self_id))?;
            Some((caps[1].to_string(), caps[3].len()))
        })
        .unwrap_or_else(|| ("AUTO".to_string(), 3));

    let max = rows
        .filter_map(|r| {
            let caps = RE_INFERRED_ID.captures(grid.text(r, header.self_id))?;
            if caps[1] != *prefix || &caps[2] != year_full {
                return None;
            }
            parse_counter(&caps[3])
        })
        .max()
        .unwrap_or(0);
    format!("{}-{}-{:0width$}", prefix, year_full, max.saturating_add(1), width = width)
}

/// 自下而上取某列最后一个非空值，没有则为空串
pub fn last_non_blank(grid: &SheetGrid, header: &HeaderMap, col: usize) -> String {
    data_rows(grid, header)
        .rev()
        .map(|r| grid.text(r, col))
        .find(|v| !v.is_empty())
        .unwrap_or("")
        .to_string()
}

/// 合并连续空白并去掉首尾空白
pub fn normalize_document_number(text: &str) -> String {
    RE_WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// 从文件名提取文号，依次尝试三种写法，都不匹配时返回空串
pub fn extract_document_number(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    for re in [&*RE_DOC_NO_CORNER, &*RE_DOC_NO_SQUARE] {
        if let Some(caps) = re.captures(&stem) {
            return normalize_document_number(&caps[1]);
        }
    }

    if let Some(caps) = RE_DOC_NO_PAREN.captures(&stem) {
        let inner = caps[1].trim();
        if RE_YEAR.is_match(inner) {
            return normalize_document_number(inner);
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    const HEADER: [&str; 8] = [
        "序号", "收文日期", "文号", "文件名", "自编号", "传阅方式", "存盒位置", "备注",
    ];

    fn sheet(data: &[[&str; 8]]) -> (SheetGrid, HeaderMap) {
        let mut rows = vec![HEADER.to_vec()];
        rows.extend(data.iter().map(|r| r.to_vec()));
        let grid = SheetGrid::from_rows("上级文", rows);
        let header = HeaderMap::build(&grid, 0).unwrap();
        (grid, header)
    }

    #[fixture]
    fn ledger() -> (SheetGrid, HeaderMap) {
        sheet(&[
            ["1", "2026/01/03", "", "a.doc", "SJW-2026-1", "传阅", "", ""],
            ["2", "2026/01/04", "", "b.doc", "SJW-2026-7", "", "", ""],
            ["abc", "", "", "c.doc", "SJW-2025-30", "传阅+会议", "", ""],
            ["", "", "", "", "QT-2026-99", "", "", ""],
        ])
    }

    #[rstest]
    fn test_infer_date_style_uses_last_filled_date(ledger: (SheetGrid, HeaderMap)) {
        let (grid, header) = ledger;
        assert_eq!(infer_date_style(&grid, &header), DateStyle::Slash);
    }

    #[rstest]
    #[case("2026.1.5", DateStyle::Dot)]
    #[case("1月5日", DateStyle::Dot)]
    #[case("", DateStyle::Dot)]
    #[case("2026/1/5", DateStyle::Slash)]
    fn test_infer_date_style_cases(#[case] date: &str, #[case] expected: DateStyle) {
        let (grid, header) = sheet(&[["1", date, "", "a.doc", "", "", "", ""]]);
        assert_eq!(infer_date_style(&grid, &header), expected);
    }

    #[rstest]
    #[case(DateStyle::Slash, Some("2026"), "2026/03/07")]
    #[case(DateStyle::Slash, None, "2025/03/07")]
    #[case(DateStyle::Dot, Some("2026"), "2025.03.07")]
    fn test_format_received_date(
        #[case] style: DateStyle,
        #[case] year: Option<&str>,
        #[case] expected: &str,
    ) {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        assert_eq!(format_received_date(date, style, year), expected);
    }

    #[rstest]
    fn test_next_sequence_is_max_plus_one(ledger: (SheetGrid, HeaderMap)) {
        let (grid, header) = ledger;
        assert_eq!(next_sequence(&grid, &header, 5), 3);
    }

    #[rstest]
    fn test_next_sequence_excludes_target_row(ledger: (SheetGrid, HeaderMap)) {
        let (grid, header) = ledger;
        assert_eq!(next_sequence(&grid, &header, 2), 2);
    }

    #[rstest]
    #[case("99999999999999999999", 5)]
    #[case("1e300", 5)]
    #[case("-1e300", 5)]
    #[case("9223372036854775807", 5)]
    #[case("4", 5)]
    fn test_next_sequence_ignores_oversized_numbers(#[case] debris: &str, #[case] expected: i64) {
        let (grid, header) = sheet(&[
            ["4", "", "", "a.doc", "", "", "", ""],
            [debris, "", "", "b.doc", "", "", "", ""],
        ]);
        assert_eq!(next_sequence(&grid, &header, 3), expected);
    }

    #[test]
    fn test_next_sequence_first_data_row_is_always_one() {
        let (grid, header) = sheet(&[["17", "", "", "", "", "", "", ""]]);
        assert_eq!(next_sequence(&grid, &header, 1), 1);
    }

    #[test]
    fn test_next_sequence_on_empty_sheet() {
        let (grid, header) = sheet(&[]);
        assert_eq!(next_sequence(&grid, &header, 3), 1);
    }

    #[rstest]
    fn test_generate_identifier_per_code_and_year(ledger: (SheetGrid, HeaderMap)) {
        let (grid, header) = ledger;
        assert_eq!(generate_identifier(&grid, &header, "SJW", "2026"), "SJW-2026-8");
        assert_eq!(generate_identifier(&grid, &header, "SJW", "2025"), "SJW-2025-31");
        assert_eq!(generate_identifier(&grid, &header, "SXTZ", "2026"), "SXTZ-2026-1");
    }

    #[test]
    fn test_generate_identifier_ignores_lookalikes() {
        let (grid, header) = sheet(&[
            ["1", "", "", "", "SJW-2026-5a", "", "", ""],
            ["2", "", "", "", "XSJW-2026-9", "", "", ""],
            ["3", "", "", "", "SJW-2026-", "", "", ""],
        ]);
        assert_eq!(generate_identifier(&grid, &header, "SJW", "2026"), "SJW-2026-1");
    }

    #[rstest]
    #[case("SJW-2026-18446744073709551615")]
    #[case("SJW-2026-99999999999999999999999")]
    #[case("SJW-2026-9007199254740993")]
    fn test_generate_identifier_ignores_oversized_suffix(#[case] debris: &str) {
        let (grid, header) = sheet(&[
            ["1", "", "", "", "SJW-2026-3", "", "", ""],
            ["2", "", "", "", debris, "", "", ""],
        ]);
        assert_eq!(generate_identifier(&grid, &header, "SJW", "2026"), "SJW-2026-4");
    }

    #[rstest]
    #[case("GW-2026-18446744073709551615")]
    #[case("GW-2026-99999999999999999999999")]
    fn test_infer_identifier_ignores_oversized_suffix(#[case] debris: &str) {
        let (grid, header) = sheet(&[
            ["1", "", "", "", "GW-2026-003", "", "", ""],
            ["2", "", "", "", debris, "", "", ""],
        ]);
        assert_eq!(infer_identifier(&grid, &header, "2026"), "GW-2026-004");
    }

    #[test]
    fn test_infer_identifier_keeps_prefix_and_width() {
        let (grid, header) = sheet(&[
            ["1", "", "", "", "GW-2025-007", "", "", ""],
            ["2", "", "", "", "GW-2025-012", "", "", ""],
            ["3", "", "", "", "GW-2026-003", "", "", ""],
        ]);
        assert_eq!(infer_identifier(&grid, &header, "2025"), "GW-2025-013");
        assert_eq!(infer_identifier(&grid, &header, "2026"), "GW-2026-004");
    }

    #[test]
    fn test_infer_identifier_defaults_to_auto() {
        let (grid, header) = sheet(&[]);
        assert_eq!(infer_identifier(&grid, &header, "2026"), "AUTO-2026-001");
    }

    #[rstest]
    fn test_last_non_blank(ledger: (SheetGrid, HeaderMap)) {
        let (grid, header) = ledger;
        assert_eq!(last_non_blank(&grid, &header, header.circulation), "传阅+会议");
        assert_eq!(last_non_blank(&grid, &header, header.storage), "");
    }

    #[rstest]
    #[case("（上级文〔2026〕998号）自动化测试文件A.doc", "上级文〔2026〕998号")]
    #[case("关于防洪工作的通知（工电函【2025】 12 号）.docx", "工电函【2025】 12 号")]
    #[case("供电段[2025]7号关于值班安排.pdf", "供电段[2025]7号")]
    #[case("自动化测试通知_（测函 2025 第3号）.doc", "测函 2025 第3号")]
    #[case("（会议纪要第3号）.doc", "")]
    #[case("季度工作总结与计划.xlsx", "")]
    #[case("上级文_2025_关于调整作息时间的通知.wps", "")]
    fn test_extract_document_number(#[case] file_name: &str, #[case] expected: &str) {
        assert_eq!(extract_document_number(file_name), expected);
    }

    #[test]
    fn test_normalize_document_number() {
        assert_eq!(normalize_document_number("  上级文〔2026〕\t 998号 "), "上级文〔2026〕 998号");
    }
}
