//! Zoom and pan state machine for the full-size image viewer.
//!
//! The engine is input-agnostic: the host forwards raw touch, mouse and wheel
//! events together with a timestamp, and reads back a [`GestureTransform`], a
//! [`ZoomIndicator`] and a [`CursorHint`]. No timers are involved; anything
//! time-dependent is computed from the `now` passed in.

use web_time::{Duration, Instant};

use crate::config::ViewerConfig;
use crate::constants::{
    INDICATOR_LARGE_SCALE, INDICATOR_SMALL_SCALE, LADDER_RECENTER_HIGH, LADDER_RECENTER_LOW,
    PAN_SLACK_SCALE, WHEEL_RECENTER_HIGH, WHEEL_RECENTER_LOW, ZOOM_LADDER, ZOOM_MAX, ZOOM_MIN,
};

/// Scale and translation applied to the viewed image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureTransform {
    /// Magnification, 1.0 is natural size
    pub scale: f32,
    /// Horizontal offset in screen pixels
    pub translate_x: f32,
    /// Vertical offset in screen pixels
    pub translate_y: f32,
}

impl GestureTransform {
    /// Create a transform with the given scale and translation.
    pub fn new(scale: f32, translate_x: f32, translate_y: f32) -> Self {
        Self {
            scale,
            translate_x,
            translate_y,
        }
    }

    /// Unscaled, centered transform.
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }

    /// CSS-style transform string; translation is divided by scale because it
    /// is applied after the scale.
    pub fn to_css(&self) -> String {
        format!(
            "scale({}) translate({}px, {}px)",
            self.scale,
            self.translate_x / self.scale,
            self.translate_y / self.scale
        )
    }
}

impl Default for GestureTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Touch interaction state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GestureState {
    /// No touch in progress
    #[default]
    Idle,
    /// One finger dragging, with its last position
    Panning { last_pos: (f32, f32) },
    /// Two fingers pinching
    Zooming {
        /// Finger distance when the pinch began
        start_distance: f32,
        /// Scale when the pinch began
        start_scale: f32,
    },
}

/// Mouse drag state, kept apart from touches.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum MouseDrag {
    #[default]
    Idle,
    Dragging { last_pos: (f32, f32) },
}

/// Visual tone of the zoom indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorTone {
    /// Zoomed well out
    Small,
    /// Zoomed well in
    Large,
    /// Close to natural size
    Normal,
    /// Anything else
    Plain,
}

/// Transient label showing the current magnification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomIndicator {
    scale: f32,
    shown_at: Instant,
}

impl ZoomIndicator {
    fn new(scale: f32, shown_at: Instant) -> Self {
        Self { scale, shown_at }
    }

    /// Scale the indicator reports.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Percentage label, e.g. `"150%"`.
    pub fn label(&self) -> String {
        match self.tone() {
            IndicatorTone::Normal => "100%".to_string(),
            _ => format!("{}%", (self.scale * 100.0).round() as i32),
        }
    }

    /// Tone used to style the label.
    pub fn tone(&self) -> IndicatorTone {
        if self.scale <= INDICATOR_SMALL_SCALE {
            IndicatorTone::Small
        } else if self.scale >= INDICATOR_LARGE_SCALE {
            IndicatorTone::Large
        } else if (self.scale - 1.0).abs() < 0.1 {
            IndicatorTone::Normal
        } else {
            IndicatorTone::Plain
        }
    }

    /// Whether the indicator is still on screen at `now`.
    pub fn is_visible(&self, now: Instant, fade_after: Duration) -> bool {
        now.saturating_duration_since(self.shown_at) < fade_after
    }
}

/// Cursor the host should show over the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorHint {
    /// Zoomed well out
    ZoomIn,
    /// Zoomed well in
    ZoomOut,
    /// Pannable
    Grab,
    /// Mouse drag in progress
    Grabbing,
}

/// Tunable viewer timings and steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureSettings {
    /// Maximum gap between two touch ends that counts as a double-tap
    pub double_tap_window: Duration,
    /// How long the zoom indicator stays visible
    pub indicator_fade: Duration,
    /// Scale change per wheel notch
    pub wheel_step: f32,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self::from(&ViewerConfig::default())
    }
}

impl From<&ViewerConfig> for GestureSettings {
    fn from(config: &ViewerConfig) -> Self {
        Self {
            double_tap_window: Duration::from_millis(config.double_tap_window_ms),
            indicator_fade: Duration::from_millis(config.indicator_fade_ms),
            wheel_step: config.wheel_step,
        }
    }
}

/// Index of the ladder level closest to `scale` (first one wins ties).
pub fn closest_ladder_index(scale: f32) -> usize {
    let mut closest = 0;
    let mut min_diff = (scale - ZOOM_LADDER[0]).abs();
    for (i, level) in ZOOM_LADDER.iter().enumerate().skip(1) {
        let diff = (scale - level).abs();
        if diff < min_diff {
            min_diff = diff;
            closest = i;
        }
    }
    closest
}

/// Nearest ladder level to `scale`.
pub fn snap_to_ladder(scale: f32) -> f32 {
    ZOOM_LADDER[closest_ladder_index(scale)]
}

/// Ladder level after the one closest to `scale`, wrapping to the first.
pub fn next_ladder_level(scale: f32) -> f32 {
    ZOOM_LADDER[(closest_ladder_index(scale) + 1) % ZOOM_LADDER.len()]
}

/// Largest allowed translation along an axis of the given element size.
pub fn max_translate(scale: f32, dimension: f32) -> f32 {
    ((scale - PAN_SLACK_SCALE) * dimension / 2.0).max(0.0)
}

/// Scale that fits an image into a viewport without shrinking below natural size.
///
/// Returns `None` when either image dimension is zero (not decoded yet).
pub fn auto_fit_scale(viewport: (f32, f32), natural: (f32, f32)) -> Option<f32> {
    let (vw, vh) = viewport;
    let (iw, ih) = natural;
    if iw <= 0.0 || ih <= 0.0 {
        return None;
    }
    let fit = (vw / iw).min(vh / ih);
    Some(fit.max(1.0).clamp(ZOOM_MIN, ZOOM_MAX))
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}

/// Pinch, pan, wheel and ladder zoom for one displayed image.
#[derive(Debug, Clone)]
pub struct ZoomPanEngine {
    transform: GestureTransform,
    state: GestureState,
    mouse: MouseDrag,
    /// Laid-out (unscaled) size of the image element
    element_size: (f32, f32),
    last_touch_end: Option<Instant>,
    indicator: Option<ZoomIndicator>,
    settings: GestureSettings,
}

impl ZoomPanEngine {
    /// Create an engine for an element of the given laid-out size.
    pub fn new(element_size: (f32, f32), settings: GestureSettings) -> Self {
        Self {
            transform: GestureTransform::identity(),
            state: GestureState::Idle,
            mouse: MouseDrag::Idle,
            element_size,
            last_touch_end: None,
            indicator: None,
            settings,
        }
    }

    /// Current transform.
    pub fn transform(&self) -> GestureTransform {
        self.transform
    }

    /// Current touch state.
    pub fn state(&self) -> GestureState {
        self.state
    }

    /// Last emitted indicator, if any.
    pub fn indicator(&self) -> Option<&ZoomIndicator> {
        self.indicator.as_ref()
    }

    /// Whether the indicator should be drawn at `now`.
    pub fn indicator_visible(&self, now: Instant) -> bool {
        self.indicator
            .is_some_and(|ind| ind.is_visible(now, self.settings.indicator_fade))
    }

    /// Cursor for the current scale and drag state.
    pub fn cursor(&self) -> CursorHint {
        if matches!(self.mouse, MouseDrag::Dragging { .. }) {
            return CursorHint::Grabbing;
        }
        let scale = self.transform.scale;
        if scale <= INDICATOR_SMALL_SCALE {
            CursorHint::ZoomIn
        } else if scale >= INDICATOR_LARGE_SCALE {
            CursorHint::ZoomOut
        } else {
            CursorHint::Grab
        }
    }

    /// Update the laid-out element size (after a resize).
    pub fn set_element_size(&mut self, width: f32, height: f32) {
        self.element_size = (width, height);
    }

    /// Translation bound for the current scale, per axis.
    pub fn max_translate(&self) -> (f32, f32) {
        (
            max_translate(self.transform.scale, self.element_size.0),
            max_translate(self.transform.scale, self.element_size.1),
        )
    }

    /// Fit a freshly loaded image into the viewport.
    ///
    /// Sets the initial transform directly without emitting an indicator.
    pub fn auto_fit(&mut self, viewport: (f32, f32), natural: (f32, f32)) -> Option<f32> {
        let scale = auto_fit_scale(viewport, natural)?;
        self.transform = GestureTransform::new(scale, 0.0, 0.0);
        log::debug!("Auto-fit {:?} into {:?} at {:.2}", natural, viewport, scale);
        Some(scale)
    }

    /// Fingers touched down. `touches` holds every active touch point.
    pub fn touch_start(&mut self, touches: &[(f32, f32)]) {
        match touches {
            [a, b, ..] => {
                self.state = GestureState::Zooming {
                    start_distance: distance(*a, *b),
                    start_scale: self.transform.scale,
                };
            }
            [only] => {
                self.state = GestureState::Panning { last_pos: *only };
            }
            [] => {}
        }
    }

    /// Fingers moved.
    pub fn touch_move(&mut self, touches: &[(f32, f32)], now: Instant) {
        match (self.state, touches) {
            (
                GestureState::Zooming {
                    start_distance,
                    start_scale,
                },
                [a, b, ..],
            ) => {
                if start_distance <= 0.0 {
                    return;
                }
                let scale = start_scale * distance(*a, *b) / start_distance;
                self.set_scale(scale.clamp(ZOOM_MIN, ZOOM_MAX), now);
            }
            (GestureState::Panning { last_pos }, [pos]) => {
                self.pan_by(pos.0 - last_pos.0, pos.1 - last_pos.1, now);
                self.state = GestureState::Panning { last_pos: *pos };
            }
            _ => {}
        }
    }

    /// A finger lifted. Two ends within the double-tap window step the ladder.
    pub fn touch_end(&mut self, now: Instant) {
        self.state = GestureState::Idle;

        let is_double_tap = self.last_touch_end.is_some_and(|last| {
            now.saturating_duration_since(last) <= self.settings.double_tap_window
        });
        if is_double_tap {
            self.cycle_ladder(now);
        }
        self.last_touch_end = Some(now);
    }

    /// The platform cancelled the touch sequence.
    pub fn touch_cancel(&mut self) {
        self.state = GestureState::Idle;
    }

    /// Mouse button pressed over the image.
    pub fn mouse_down(&mut self, pos: (f32, f32)) {
        self.mouse = MouseDrag::Dragging { last_pos: pos };
    }

    /// Mouse moved; pans while dragging.
    pub fn mouse_move(&mut self, pos: (f32, f32), now: Instant) {
        if let MouseDrag::Dragging { last_pos } = self.mouse {
            self.pan_by(pos.0 - last_pos.0, pos.1 - last_pos.1, now);
            self.mouse = MouseDrag::Dragging { last_pos: pos };
        }
    }

    /// Mouse button released.
    pub fn mouse_up(&mut self) {
        self.mouse = MouseDrag::Idle;
    }

    /// Pointer left the image; ends any drag.
    pub fn mouse_leave(&mut self) {
        self.mouse = MouseDrag::Idle;
    }

    /// Wheel notch. Positive `delta_y` (scrolling down) zooms out.
    pub fn wheel(&mut self, delta_y: f32, now: Instant) {
        let step = if delta_y > 0.0 {
            -self.settings.wheel_step
        } else {
            self.settings.wheel_step
        };
        let scale = (self.transform.scale + step).clamp(ZOOM_MIN, ZOOM_MAX);
        if scale <= WHEEL_RECENTER_LOW || scale >= WHEEL_RECENTER_HIGH {
            self.recenter();
        }
        self.set_scale(scale, now);
    }

    /// Double-click: same as a double-tap.
    pub fn double_click(&mut self, now: Instant) {
        self.cycle_ladder(now);
    }

    /// Advance to the ladder level after the closest one.
    pub fn cycle_ladder(&mut self, now: Instant) {
        let scale = next_ladder_level(self.transform.scale);
        if scale <= LADDER_RECENTER_LOW || scale >= LADDER_RECENTER_HIGH {
            self.recenter();
        }
        log::trace!("Ladder step {:.2} -> {:.2}", self.transform.scale, scale);
        self.set_scale(scale, now);
    }

    fn recenter(&mut self) {
        self.transform.translate_x = 0.0;
        self.transform.translate_y = 0.0;
    }

    /// Apply a new scale and pull the translation back inside its bound.
    fn set_scale(&mut self, scale: f32, now: Instant) {
        self.transform.scale = scale;
        let (max_x, max_y) = self.max_translate();
        self.transform.translate_x = self.transform.translate_x.clamp(-max_x, max_x);
        self.transform.translate_y = self.transform.translate_y.clamp(-max_y, max_y);
        self.emit(now);
    }

    fn pan_by(&mut self, dx: f32, dy: f32, now: Instant) {
        let (max_x, max_y) = self.max_translate();
        self.transform.translate_x = (self.transform.translate_x + dx).clamp(-max_x, max_x);
        self.transform.translate_y = (self.transform.translate_y + dy).clamp(-max_y, max_y);
        self.emit(now);
    }

    fn emit(&mut self, now: Instant) {
        self.indicator = Some(ZoomIndicator::new(self.transform.scale, now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.0001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn engine() -> ZoomPanEngine {
        ZoomPanEngine::new((400.0, 300.0), GestureSettings::default())
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_ladder_lookup() {
        assert_eq!(closest_ladder_index(1.0), 2);
        assert_eq!(closest_ladder_index(0.0), 0);
        assert_eq!(closest_ladder_index(10.0), 5);
        // 1.25 is equidistant from 1.0 and 1.5; the lower level wins
        assert_eq!(closest_ladder_index(1.25), 2);
        assert!(approx_eq(snap_to_ladder(1.8), 2.0));
        assert!(approx_eq(next_ladder_level(3.0), 0.3));
    }

    #[test]
    fn test_double_tap_then_quick_third_tap_cycles_twice() {
        let mut e = engine();
        let t0 = Instant::now();

        e.touch_end(t0);
        assert!(approx_eq(e.transform().scale, 1.0));

        e.touch_end(t0 + ms(120));
        assert!(approx_eq(e.transform().scale, 1.5));

        e.touch_end(t0 + ms(240));
        assert!(approx_eq(e.transform().scale, 2.0));
    }

    #[test]
    fn test_slow_taps_do_not_cycle() {
        let mut e = engine();
        let t0 = Instant::now();
        e.touch_end(t0);
        e.touch_end(t0 + ms(301));
        assert!(approx_eq(e.transform().scale, 1.0));
        // Window is inclusive
        e.touch_end(t0 + ms(601));
        assert!(approx_eq(e.transform().scale, 1.5));
    }

    #[test]
    fn test_ladder_wraps_and_recenters() {
        let mut e = engine();
        let now = Instant::now();
        e.auto_fit((100.0, 100.0), (10.0, 10.0));
        assert!(approx_eq(e.transform().scale, 4.0));

        e.double_click(now);
        assert!(approx_eq(e.transform().scale, 0.3));
        assert_eq!(e.transform().translate_x, 0.0);
        e.double_click(now);
        assert!(approx_eq(e.transform().scale, 0.5));
    }

    #[test]
    fn test_pinch_scales_and_clamps() {
        let mut e = engine();
        let now = Instant::now();
        e.touch_start(&[(0.0, 0.0), (100.0, 0.0)]);
        assert!(matches!(e.state(), GestureState::Zooming { .. }));

        e.touch_move(&[(0.0, 0.0), (150.0, 0.0)], now);
        assert!(approx_eq(e.transform().scale, 1.5));

        e.touch_move(&[(0.0, 0.0), (1000.0, 0.0)], now);
        assert!(approx_eq(e.transform().scale, ZOOM_MAX));

        e.touch_move(&[(0.0, 0.0), (1.0, 0.0)], now);
        assert!(approx_eq(e.transform().scale, ZOOM_MIN));
    }

    #[test]
    fn test_second_finger_during_pan_starts_pinch() {
        let mut e = engine();
        let now = Instant::now();
        e.touch_start(&[(10.0, 10.0)]);
        assert!(matches!(e.state(), GestureState::Panning { .. }));

        e.touch_start(&[(10.0, 10.0), (110.0, 10.0)]);
        assert!(matches!(e.state(), GestureState::Zooming { .. }));

        // A one-finger move during a pinch is ignored
        e.touch_move(&[(50.0, 50.0)], now);
        assert_eq!(e.transform().translate_x, 0.0);

        e.touch_end(now);
        assert_eq!(e.state(), GestureState::Idle);
    }

    #[test]
    fn test_pan_is_bounded() {
        let mut e = engine();
        let now = Instant::now();
        // At scale 1.0 on a 400x300 element: bounds are 140 x 105
        let (max_x, max_y) = e.max_translate();
        assert!(approx_eq(max_x, 140.0));
        assert!(approx_eq(max_y, 105.0));

        e.touch_start(&[(0.0, 0.0)]);
        e.touch_move(&[(500.0, -500.0)], now);
        assert!(approx_eq(e.transform().translate_x, 140.0));
        assert!(approx_eq(e.transform().translate_y, -105.0));

        e.touch_move(&[(480.0, -500.0)], now);
        assert!(approx_eq(e.transform().translate_x, 120.0));
    }

    #[test]
    fn test_no_pan_room_at_minimum_slack() {
        assert_eq!(max_translate(0.3, 1000.0), 0.0);
        assert_eq!(max_translate(0.2, 1000.0), 0.0);
        assert!(approx_eq(max_translate(2.3, 100.0), 100.0));
    }

    #[test]
    fn test_zoom_out_reclamps_translation() {
        let mut e = engine();
        let now = Instant::now();
        e.mouse_down((0.0, 0.0));
        e.mouse_move((1000.0, 0.0), now);
        assert!(approx_eq(e.transform().translate_x, 140.0));
        e.mouse_up();

        e.wheel(1.0, now);
        let t = e.transform();
        assert!(approx_eq(t.scale, 0.85));
        assert!(approx_eq(t.translate_x, max_translate(0.85, 400.0)));
    }

    #[test]
    fn test_wheel_steps_and_recenter() {
        let mut e = engine();
        let now = Instant::now();
        e.wheel(-1.0, now);
        assert!(approx_eq(e.transform().scale, 1.15));

        for _ in 0..40 {
            e.wheel(-1.0, now);
        }
        assert!(approx_eq(e.transform().scale, ZOOM_MAX));
        assert_eq!(e.transform().translate_x, 0.0);

        for _ in 0..40 {
            e.wheel(1.0, now);
        }
        assert!(approx_eq(e.transform().scale, ZOOM_MIN));
    }

    #[test]
    fn test_scale_and_translation_stay_in_bounds() {
        let mut e = engine();
        let t0 = Instant::now();
        let mut now = t0;
        for step in 0..60u64 {
            now += ms(170);
            match step % 5 {
                0 => e.wheel(if step % 2 == 0 { -1.0 } else { 1.0 }, now),
                1 => {
                    e.mouse_down((0.0, 0.0));
                    e.mouse_move(((step * 37 % 900) as f32 - 450.0, 300.0), now);
                    e.mouse_up();
                }
                2 => e.touch_end(now),
                3 => {
                    e.touch_start(&[(0.0, 0.0), (100.0, 0.0)]);
                    e.touch_move(&[(0.0, 0.0), ((step * 13 % 500) as f32, 0.0)], now);
                    e.touch_end(now);
                }
                _ => e.double_click(now),
            }
            let t = e.transform();
            let (max_x, max_y) = e.max_translate();
            assert!((ZOOM_MIN..=ZOOM_MAX).contains(&t.scale));
            assert!(t.translate_x.abs() <= max_x + EPSILON);
            assert!(t.translate_y.abs() <= max_y + EPSILON);
        }
    }

    #[test]
    fn test_auto_fit() {
        assert!(approx_eq(
            auto_fit_scale((800.0, 600.0), (1600.0, 600.0)).unwrap(),
            1.0
        ));
        assert!(approx_eq(
            auto_fit_scale((800.0, 600.0), (200.0, 100.0)).unwrap(),
            4.0
        ));
        assert!(approx_eq(
            auto_fit_scale((800.0, 600.0), (400.0, 200.0)).unwrap(),
            2.0
        ));
        assert!(auto_fit_scale((800.0, 600.0), (0.0, 100.0)).is_none());
    }

    #[test]
    fn test_indicator_label_tone_and_fade() {
        let mut e = engine();
        let t0 = Instant::now();
        assert!(!e.indicator_visible(t0));

        e.wheel(-1.0, t0);
        let ind = *e.indicator().unwrap();
        assert_eq!(ind.label(), "115%");
        assert_eq!(ind.tone(), IndicatorTone::Plain);
        assert!(e.indicator_visible(t0 + ms(1799)));
        assert!(!e.indicator_visible(t0 + ms(1800)));

        e.wheel(1.0, t0);
        assert_eq!(e.indicator().unwrap().label(), "100%");
        assert_eq!(e.indicator().unwrap().tone(), IndicatorTone::Normal);

        let small = ZoomIndicator::new(0.5, t0);
        assert_eq!(small.tone(), IndicatorTone::Small);
        assert_eq!(small.label(), "50%");
        assert_eq!(ZoomIndicator::new(3.0, t0).tone(), IndicatorTone::Large);
    }

    #[test]
    fn test_cursor_hints() {
        let mut e = engine();
        let now = Instant::now();
        assert_eq!(e.cursor(), CursorHint::Grab);

        e.mouse_down((0.0, 0.0));
        assert_eq!(e.cursor(), CursorHint::Grabbing);
        e.mouse_leave();
        assert_eq!(e.cursor(), CursorHint::Grab);

        // 1.0 -> 1.5 -> 2.0 -> 3.0
        for _ in 0..3 {
            e.double_click(now);
        }
        assert_eq!(e.cursor(), CursorHint::ZoomOut);
        e.double_click(now);
        assert_eq!(e.cursor(), CursorHint::ZoomIn);
    }

    #[test]
    fn test_css_transform() {
        let t = GestureTransform::new(2.0, 40.0, -20.0);
        assert_eq!(t.to_css(), "scale(2) translate(20px, -10px)");
    }
}
