//! Cursor pagination over an in-memory result set.
//!
//! Offsets and page flags follow the Relay array-connection algorithm, and a
//! cursor is the base64 of `"arrayconnection:<offset>"`, so cursors issued by
//! the previous API keep working.

use async_graphql::{
    connection::{Connection, CursorType, Edge},
    OutputType,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::AppError;

const CURSOR_PREFIX: &str = "arrayconnection:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayCursor(pub usize);

impl CursorType for ArrayCursor {
    type Error = String;

    fn decode_cursor(s: &str) -> Result<Self, Self::Error> {
        let raw = STANDARD.decode(s).map_err(|e| e.to_string())?;
        let raw = String::from_utf8(raw).map_err(|e| e.to_string())?;
        raw.strip_prefix(CURSOR_PREFIX)
            .and_then(|n| n.parse::<usize>().ok())
            .map(ArrayCursor)
            .ok_or_else(|| format!("invalid cursor '{s}'"))
    }

    fn encode_cursor(&self) -> String {
        STANDARD.encode(format!("{CURSOR_PREFIX}{}", self.0))
    }
}

#[derive(Debug, Clone, Default)]
pub struct PageArgs {
    pub after: Option<String>,
    pub before: Option<String>,
    pub first: Option<i32>,
    pub last: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: usize,
    pub end: usize,
    pub has_previous_page: bool,
    pub has_next_page: bool,
}

// Offsets past the end behave like the end itself.
fn offset_of(cursor: Option<&str>, len: i64) -> Option<i64> {
    cursor
        .and_then(|c| ArrayCursor::decode_cursor(c).ok())
        .map(|c| i64::try_from(c.0).unwrap_or(i64::MAX).min(len))
}

fn non_negative(name: &str, value: Option<i32>) -> Result<Option<i64>, AppError> {
    match value {
        Some(v) if v < 0 => Err(AppError::Validation(format!(
            "argument '{name}' must be a non-negative integer"
        ))),
        other => Ok(other.map(i64::from)),
    }
}

/// Computes which slice of `len` items a request selects.
pub fn window(len: usize, args: &PageArgs) -> Result<Window, AppError> {
    let first = non_negative("first", args.first)?;
    let last = non_negative("last", args.last)?;
    let len = len as i64;

    // Undecodable cursors fall back to the unbounded defaults.
    let after_offset = offset_of(args.after.as_deref(), len);
    let before_offset = offset_of(args.before.as_deref(), len);

    let mut start = after_offset.unwrap_or(-1).max(-1) + 1;
    let mut end = before_offset.unwrap_or(len).min(len);

    if let Some(first) = first {
        end = end.min(start.saturating_add(first));
    }
    if let Some(last) = last {
        start = start.max(end.saturating_sub(last));
    }

    let lower_bound = after_offset.map(|a| a + 1).unwrap_or(0);
    let upper_bound = before_offset.unwrap_or(len);
    let has_previous_page = last.is_some() && start > lower_bound;
    let has_next_page = first.is_some() && end < upper_bound;

    let start = start.clamp(0, len);
    let end = end.clamp(start, len);
    Ok(Window {
        start: start as usize,
        end: end as usize,
        has_previous_page,
        has_next_page,
    })
}

/// Slices `items` into a connection page.
pub fn paginate<T, N, F>(
    items: Vec<T>,
    args: &PageArgs,
    to_node: F,
) -> Result<Connection<ArrayCursor, N>, AppError>
where
    N: OutputType,
    F: Fn(T) -> N,
{
    let w = window(items.len(), args)?;
    let mut connection = Connection::new(w.has_previous_page, w.has_next_page);
    connection.edges.extend(
        items
            .into_iter()
            .enumerate()
            .skip(w.start)
            .take(w.end - w.start)
            .map(|(offset, item)| Edge::new(ArrayCursor(offset), to_node(item))),
    );
    Ok(connection)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(n: usize) -> Option<String> {
        Some(ArrayCursor(n).encode_cursor())
    }

    #[test]
    fn cursor_matches_relay_encoding() {
        // base64("arrayconnection:0")
        assert_eq!(ArrayCursor(0).encode_cursor(), "YXJyYXljb25uZWN0aW9uOjA=");
        assert_eq!(ArrayCursor::decode_cursor("YXJyYXljb25uZWN0aW9uOjA=").unwrap(), ArrayCursor(0));
        assert!(ArrayCursor::decode_cursor("garbage").is_err());
    }

    #[test]
    fn no_arguments_returns_everything() {
        let w = window(5, &PageArgs::default()).unwrap();
        assert_eq!((w.start, w.end), (0, 5));
        assert!(!w.has_previous_page && !w.has_next_page);
    }

    #[test]
    fn first_pages_forward() {
        let args = PageArgs { first: Some(2), ..Default::default() };
        let w = window(5, &args).unwrap();
        assert_eq!((w.start, w.end), (0, 2));
        assert!(w.has_next_page);
        assert!(!w.has_previous_page);

        let args = PageArgs { first: Some(2), after: cursor(1), ..Default::default() };
        let w = window(5, &args).unwrap();
        assert_eq!((w.start, w.end), (2, 4));
        assert!(w.has_next_page);

        let args = PageArgs { first: Some(2), after: cursor(3), ..Default::default() };
        let w = window(5, &args).unwrap();
        assert_eq!((w.start, w.end), (4, 5));
        assert!(!w.has_next_page);
    }

    #[test]
    fn last_pages_backward() {
        let args = PageArgs { last: Some(2), ..Default::default() };
        let w = window(5, &args).unwrap();
        assert_eq!((w.start, w.end), (3, 5));
        assert!(w.has_previous_page);
        assert!(!w.has_next_page);

        let args = PageArgs { last: Some(2), before: cursor(3), ..Default::default() };
        let w = window(5, &args).unwrap();
        assert_eq!((w.start, w.end), (1, 3));
        assert!(w.has_previous_page);

        let args = PageArgs { last: Some(10), before: cursor(3), ..Default::default() };
        let w = window(5, &args).unwrap();
        assert_eq!((w.start, w.end), (0, 3));
        assert!(!w.has_previous_page);
    }

    #[test]
    fn after_and_before_bound_the_range() {
        let args = PageArgs { after: cursor(0), before: cursor(4), ..Default::default() };
        let w = window(5, &args).unwrap();
        assert_eq!((w.start, w.end), (1, 4));
    }

    #[test]
    fn invalid_cursor_is_ignored() {
        let args = PageArgs { first: Some(1), after: Some("bogus".into()), ..Default::default() };
        let w = window(3, &args).unwrap();
        assert_eq!((w.start, w.end), (0, 1));
    }

    #[test]
    fn cursor_past_the_end_yields_empty_page() {
        let args = PageArgs { first: Some(2), after: cursor(10), ..Default::default() };
        let w = window(3, &args).unwrap();
        assert_eq!(w.start, w.end);
        assert!(!w.has_next_page);
    }

    #[test]
    fn huge_cursor_offsets_do_not_overflow() {
        let huge = Some(STANDARD.encode(format!("{CURSOR_PREFIX}{}", i64::MAX)));
        let args = PageArgs { first: Some(2), after: huge.clone(), ..Default::default() };
        let w = window(3, &args).unwrap();
        assert_eq!(w.start, w.end);
        assert_eq!(w.end, 3);
        assert!(!w.has_next_page);

        let args = PageArgs { last: Some(2), before: huge, ..Default::default() };
        let w = window(3, &args).unwrap();
        assert_eq!((w.start, w.end), (1, 3));
        assert!(w.has_previous_page);

        let beyond_i64 = Some(STANDARD.encode(format!("{CURSOR_PREFIX}{}", usize::MAX)));
        let args = PageArgs { first: Some(i32::MAX), after: beyond_i64, ..Default::default() };
        let w = window(3, &args).unwrap();
        assert_eq!(w.start, w.end);
    }

    #[test]
    fn negative_counts_are_rejected() {
        let args = PageArgs { first: Some(-1), ..Default::default() };
        assert!(matches!(window(3, &args), Err(AppError::Validation(_))));
        let args = PageArgs { last: Some(-1), ..Default::default() };
        assert!(window(3, &args).is_err());
    }

    #[test]
    fn paginate_assigns_absolute_cursors() {
        let args = PageArgs { first: Some(2), after: cursor(0), ..Default::default() };
        let conn = paginate(vec!["a", "b", "c", "d"], &args, |s| s.to_string()).unwrap();
        let got: Vec<_> = conn.edges.iter().map(|e| (e.cursor, e.node.clone())).collect();
        assert_eq!(got, vec![(ArrayCursor(1), "b".to_string()), (ArrayCursor(2), "c".to_string())]);
        assert!(conn.has_next_page);
    }
}
