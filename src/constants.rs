//! Global constants for the imgsync engine

/// Smallest scale the full-size viewer allows
pub const ZOOM_MIN: f32 = 0.2;

/// Largest scale the full-size viewer allows
pub const ZOOM_MAX: f32 = 4.0;

/// Discrete zoom levels cycled by double-tap and double-click
pub const ZOOM_LADDER: [f32; 6] = [0.3, 0.5, 1.0, 1.5, 2.0, 3.0];

/// Scale at which the pan range collapses to zero
pub const PAN_SLACK_SCALE: f32 = 0.3;

/// Ladder steps at or below this scale recenter the image
pub const LADDER_RECENTER_LOW: f32 = 0.5;

/// Ladder steps at or above this scale recenter the image
pub const LADDER_RECENTER_HIGH: f32 = 2.0;

/// Wheel zooms at or below this scale recenter the image
pub const WHEEL_RECENTER_LOW: f32 = 0.5;

/// Wheel zooms at or above this scale recenter the image
pub const WHEEL_RECENTER_HIGH: f32 = 3.0;

/// Scale change per wheel notch
pub const DEFAULT_WHEEL_STEP: f32 = 0.15;

/// Two touch ends closer than this count as a double-tap
pub const DEFAULT_DOUBLE_TAP_WINDOW_MS: u64 = 300;

/// Time the zoom indicator stays visible after the last transform update
pub const DEFAULT_INDICATOR_FADE_MS: u64 = 1800;

/// Indicator switches to the "small" tone at or below this scale
pub const INDICATOR_SMALL_SCALE: f32 = 0.5;

/// Indicator switches to the "large" tone at or above this scale
pub const INDICATOR_LARGE_SCALE: f32 = 2.5;

/// Group label written with each record when the host provides none
pub const DEFAULT_GROUP_LABEL: &str = "unknown_table";

/// Status token published once the pending batch has been encoded
pub const READY_STATUS: &str = "ready";
