//! Column pipeline and width math for ResourceTable.

use crate::form::{ColumnWidth, Field};
use unicode_width::UnicodeWidthChar;

/// One rendered column of a table.
#[derive(Debug)]
pub enum TableColumn<'a, D> {
    /// Row check box
    Check,
    /// A declared column
    Data(&'a Field<D>),
    /// Edit/view/delete buttons, with their width
    Operate(u16),
}

impl<D> Clone for TableColumn<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D> Copy for TableColumn<'_, D> {}

impl<D> TableColumn<'_, D> {
    pub fn width(&self) -> ColumnWidth {
        match self {
            Self::Check => ColumnWidth::Fixed(3),
            Self::Data(field) => field.width,
            Self::Operate(width) => ColumnWidth::Fixed(*width),
        }
    }
}

/// Columns in display order: the check column when rows can be checked,
/// the declared columns, then the operate column when rows can be edited
/// or deleted.
pub fn table_columns<D>(
    fields: &[Field<D>],
    checkable: bool,
    operate_width: Option<u16>,
) -> Vec<TableColumn<'_, D>> {
    let mut columns = Vec::with_capacity(fields.len() + 2);
    if checkable {
        columns.push(TableColumn::Check);
    }
    columns.extend(fields.iter().map(TableColumn::Data));
    if let Some(width) = operate_width {
        columns.push(TableColumn::Operate(width));
    }
    columns
}

/// Split `total_width` between columns, one separator cell apart.
pub fn calculate_column_widths(widths: &[ColumnWidth], total_width: usize) -> Vec<u16> {
    let col_count = widths.len();
    if col_count == 0 {
        return vec![];
    }

    // Reserve space for separators
    let separators = col_count.saturating_sub(1);
    let available = total_width.saturating_sub(separators);

    let mut result = vec![0u16; col_count];
    let mut remaining = available;
    let mut total_flex: u32 = 0;

    // First pass: fixed and percentage widths
    for (i, width) in widths.iter().enumerate() {
        match *width {
            ColumnWidth::Fixed(w) => {
                let w = w.min(remaining as u16);
                result[i] = w;
                remaining -= w as usize;
            }
            ColumnWidth::Percentage(p) => {
                let w = ((available as f32 * p / 100.0) as usize).min(remaining);
                result[i] = w as u16;
                remaining -= w;
            }
            ColumnWidth::Flex(f) => total_flex += u32::from(f),
        }
    }

    // Second pass: distribute remaining to flex columns
    if total_flex > 0 {
        for (i, width) in widths.iter().enumerate() {
            if let ColumnWidth::Flex(f) = *width {
                result[i] = (remaining as u64 * u64::from(f) / u64::from(total_flex)) as u16;
            }
        }
    }

    result
}

/// Cut `s` to `max_width` columns, marking the cut with an ellipsis.
pub fn truncate_with_ellipsis(s: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    let width: usize = s.chars().map(|c| c.width().unwrap_or(0)).sum();
    if width <= max_width {
        return s.to_string();
    }

    let budget = if max_width <= 3 { max_width } else { max_width - 3 };
    let mut used = 0;
    let mut out = String::new();
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    if max_width > 3 {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_order() {
        let fields: Vec<Field<()>> = vec![Field::new("id"), Field::new("name")];

        let all = table_columns(&fields, true, Some(10));
        assert!(matches!(all[0], TableColumn::Check));
        assert!(matches!(all[1], TableColumn::Data(f) if f.key.as_deref() == Some("id")));
        assert!(matches!(all[3], TableColumn::Operate(10)));

        let plain = table_columns(&fields, false, None);
        assert_eq!(plain.len(), 2);
        assert!(plain.iter().all(|c| matches!(c, TableColumn::Data(_))));
    }

    #[test]
    fn test_column_widths() {
        let widths = [
            ColumnWidth::Fixed(3),
            ColumnWidth::Flex(1),
            ColumnWidth::Flex(2),
            ColumnWidth::Fixed(10),
        ];
        // 3 separators, 3 + 10 fixed, 30 left for flex
        assert_eq!(calculate_column_widths(&widths, 46), vec![3, 10, 20, 10]);

        // fixed columns never overrun the row
        let cramped = calculate_column_widths(&[ColumnWidth::Fixed(20), ColumnWidth::Fixed(20)], 25);
        assert_eq!(cramped, vec![20, 4]);
        assert!(calculate_column_widths(&[], 80).is_empty());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate_with_ellipsis("hello", 10), "hello");
        assert_eq!(truncate_with_ellipsis("hello world", 8), "hello...");
        assert_eq!(truncate_with_ellipsis("hello", 2), "he");
        assert_eq!(truncate_with_ellipsis("hello", 0), "");
        // wide characters count double
        assert_eq!(truncate_with_ellipsis("日本語テキスト", 7), "日本...");
    }
}
