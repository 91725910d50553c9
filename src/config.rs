//! Startup configuration.
//!
//! A [`Config`] is handed to [`crate::flow::run_with_config`] once. Values that may
//! change while the game runs (clear colour, tick duration) are copied into the
//! [`crate::context::Context`] and can be changed later via `Out::Configure`.

/// Window, renderer and logging settings used when the app starts.
#[derive(Debug, Clone)]
pub struct Config {
    pub title: String,
    /// Logical width of the window in pixels.
    pub width: u32,
    /// Logical height of the window in pixels.
    pub height: u32,
    /// Requested MSAA sample count. See [`Config::sample_count`].
    pub sample_count: u32,
    pub tick_duration_millis: u64,
    pub clear_colour: wgpu::Color,
    /// Id of the `<canvas>` element the game attaches to on the web.
    pub canvas_id: String,
    pub log_level: log::LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: concat!("vector-ngin - ", env!("CARGO_PKG_VERSION")).to_string(),
            width: 800,
            height: 600,
            sample_count: 4,
            tick_duration_millis: 100,
            clear_colour: wgpu::Color::WHITE,
            canvas_id: "canvas".to_string(),
            log_level: log::LevelFilter::Info,
        }
    }
}

impl Config {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }

    pub fn with_tick_duration_millis(mut self, millis: u64) -> Self {
        self.tick_duration_millis = millis;
        self
    }

    pub fn with_clear_colour(mut self, colour: wgpu::Color) -> Self {
        self.clear_colour = colour;
        self
    }

    pub fn with_canvas_id(mut self, canvas_id: impl Into<String>) -> Self {
        self.canvas_id = canvas_id.into();
        self
    }

    pub fn with_log_level(mut self, level: log::LevelFilter) -> Self {
        self.log_level = level;
        self
    }

    /// The sample count actually used by the renderer.
    ///
    /// Only 1 and 4 are guaranteed on every backend (WebGL2 included), so other
    /// requests are rounded to the nearest of the two.
    pub fn sample_count(&self) -> u32 {
        let normalised = if self.sample_count > 1 { 4 } else { 1 };
        if normalised != self.sample_count {
            log::warn!(
                "MSAA sample count {} is not portable, using {} instead",
                self.sample_count,
                normalised
            );
        }
        normalised
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_demo_window() {
        let config = Config::default();
        assert_eq!((config.width, config.height), (800, 600));
        assert_eq!(config.canvas_id, "canvas");
        assert!(config.title.starts_with("vector-ngin - "));
    }

    #[test]
    fn sample_count_is_rounded_to_portable_values() {
        assert_eq!(Config::default().with_sample_count(0).sample_count(), 1);
        assert_eq!(Config::default().with_sample_count(1).sample_count(), 1);
        assert_eq!(Config::default().with_sample_count(4).sample_count(), 4);
        assert_eq!(Config::default().with_sample_count(8).sample_count(), 4);
    }

    #[test]
    fn builder_setters_override_defaults() {
        let config = Config::default()
            .with_title("test")
            .with_size(320, 240)
            .with_tick_duration_millis(16)
            .with_canvas_id("game");
        assert_eq!(config.title, "test");
        assert_eq!((config.width, config.height), (320, 240));
        assert_eq!(config.tick_duration_millis, 16);
        assert_eq!(config.canvas_id, "game");
    }
}
