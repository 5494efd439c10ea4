//! Stepped range input, drawn as a slider or as a row of rating icons.

use super::{Field, FormAction, FormState, Value};

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

const SLIDER_CELLS: usize = 20;

/// Bounds and increment of a range field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeScale {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl RangeScale {
    /// Bounds declared by `field`. Without a max, an icon range has five
    /// steps and a slider a hundred.
    pub fn of<D>(field: &Field<D>) -> Self {
        let min = field.min.unwrap_or(0.0);
        let default_max = if field.icon.is_some() { 5.0 } else { 100.0 };
        let max = field.max.unwrap_or(default_max).max(min);
        let step = field.step.filter(|s| *s > 0.0).unwrap_or(1.0);
        Self { min, max, step }
    }

    /// Current position of `value`; the minimum when unset or unparsable.
    pub fn value_of(&self, value: &Value) -> f64 {
        let n = match value {
            Value::Number(n) => *n,
            Value::String(s) => s.trim().parse().unwrap_or(self.min),
            _ => self.min,
        };
        n.clamp(self.min, self.max)
    }

    /// How much of the step drawn by icon `index` the value covers, from
    /// `0` to `step`.
    pub fn fill(&self, value: f64, index: usize) -> f64 {
        let full = self.step * index as f64;
        (value - full).clamp(0.0, self.step)
    }

    /// Number of icons in a rating.
    pub fn icon_count(&self) -> usize {
        self.max.max(0.0) as usize
    }
}

/// Left/Down step down, Right/Up step up, Home and End jump to the bounds.
pub(crate) fn range_key<D>(
    field: &Field<D>,
    name: &str,
    key: KeyEvent,
    state: &mut FormState,
) -> Option<FormAction> {
    let scale = RangeScale::of(field);
    let current = state.get(name).map_or(scale.min, |v| scale.value_of(v));
    let next = match key.code {
        KeyCode::Left | KeyCode::Down => current - scale.step,
        KeyCode::Right | KeyCode::Up => current + scale.step,
        KeyCode::Home => scale.min,
        KeyCode::End => scale.max,
        _ => return None,
    }
    .clamp(scale.min, scale.max);

    let unset = state.get(name).map_or(true, Value::is_empty);
    if next == current && !unset {
        return None;
    }
    state.set(name, next);
    Some(FormAction::Edited)
}

pub(crate) fn range_line<D>(field: &Field<D>, value: &Value) -> Line<'static> {
    let scale = RangeScale::of(field);
    let n = scale.value_of(value);
    let label = Value::Number(n).display();

    if let Some(icon) = &field.icon {
        let mut spans: Vec<Span<'static>> = (0..scale.icon_count())
            .map(|index| icon(scale.fill(n, index)))
            .collect();
        spans.push(Span::styled(format!(" {label}"), Style::default().fg(Color::DarkGray)));
        return Line::from(spans);
    }

    let span = scale.max - scale.min;
    let ratio = if span > 0.0 { (n - scale.min) / span } else { 0.0 };
    let filled = ((ratio * SLIDER_CELLS as f64).round() as usize).min(SLIDER_CELLS);
    Line::from(vec![
        Span::raw("["),
        Span::styled("=".repeat(filled), Style::default().fg(Color::Cyan)),
        Span::raw(" ".repeat(SLIDER_CELLS - filled)),
        Span::raw(format!("] {label}")),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::InputKind;
    use crossterm::event::KeyModifiers;

    type F = Field<()>;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn star(fill: f64) -> Span<'static> {
        Span::raw(if fill >= 1.0 {
            "*"
        } else if fill > 0.0 {
            "+"
        } else {
            "."
        })
    }

    #[test]
    fn test_defaults() {
        let slider = RangeScale::of(&F::new("volume").kind(InputKind::Range));
        assert_eq!(slider, RangeScale { min: 0.0, max: 100.0, step: 1.0 });

        let rating = RangeScale::of(&F::new("stars").kind(InputKind::Range).icon(star));
        assert_eq!(rating.max, 5.0);
        assert_eq!(rating.icon_count(), 5);
    }

    #[test]
    fn test_fill_per_icon() {
        let scale = RangeScale { min: 0.0, max: 5.0, step: 1.0 };
        let fills: Vec<f64> = (0..5).map(|i| scale.fill(2.5, i)).collect();
        assert_eq!(fills, vec![1.0, 1.0, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_keys_step_within_bounds() {
        let field = F::new("stars").kind(InputKind::Range).max(3.0).step(1.0);
        let mut state = FormState::new();

        assert_eq!(range_key(&field, "stars", key(KeyCode::Right), &mut state), Some(FormAction::Edited));
        assert_eq!(state.get("stars"), Some(&Value::Number(1.0)));

        range_key(&field, "stars", key(KeyCode::End), &mut state);
        assert_eq!(state.get("stars"), Some(&Value::Number(3.0)));
        assert_eq!(range_key(&field, "stars", key(KeyCode::Up), &mut state), None);

        range_key(&field, "stars", key(KeyCode::Left), &mut state);
        assert_eq!(state.get("stars"), Some(&Value::Number(2.0)));
        assert_eq!(range_key(&field, "stars", key(KeyCode::Char('x')), &mut state), None);
    }

    #[test]
    fn test_lines() {
        let rating = F::new("stars").kind(InputKind::Range).icon(star);
        let line = range_line(&rating, &Value::Number(3.5));
        assert_eq!(line.to_string(), "***+. 3.5");

        let slider = F::new("volume").kind(InputKind::Range);
        let line = range_line(&slider, &Value::from("50"));
        assert_eq!(line.to_string(), format!("[{}{}] 50", "=".repeat(10), " ".repeat(10)));
        assert_eq!(range_line(&slider, &Value::None).to_string(), format!("[{}] 0", " ".repeat(20)));
    }
}
