use log::info;

pub const PRESET_BLEND_SECONDS: f64 = 2.0;
pub const CAROUSEL_INTERVAL_MS: u64 = 8_000;

pub const CAROUSEL_IMAGES: [&str; 5] = [
    "https://media.giphy.com/media/3o7TKAXkWwJBawSsfu/giphy.gif",
    "https://media.giphy.com/media/l0HlvyZMx9K4u5WuY/giphy.gif",
    "https://media.giphy.com/media/26tn33aiTi1jkl6H6/giphy.gif",
    "https://media.giphy.com/media/3oKIPEAVLNcZCNOpLa/giphy.gif",
    "https://media.giphy.com/media/l41lPTfaKeKbwBllm/giphy.gif",
];

/// A frame-driven visualizer bound to a canvas.
pub trait Renderer {
    fn preset_names(&self) -> Vec<String>;
    fn load_preset(&mut self, name: &str, blend_seconds: f64);
    fn set_size(&mut self, width: u32, height: u32);
    fn render(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Renderer,
    Carousel,
}

#[derive(Debug)]
pub struct Visualization<R> {
    supported: bool,
    renderer: Option<R>,
    presets: Vec<String>,
    preset: usize,
    mode: Mode,
    enabled: bool,
    image: usize,
    image_shown_at: u64,
    size: (u32, u32),
}

impl<R: Renderer> Visualization<R> {
    /// `supported` is the result of the one-off renderer feature check.
    pub fn new(supported: bool, now_ms: u64) -> Self {
        if !supported {
            info!("visualizer unsupported, showing image carousel");
        }

        Visualization {
            supported,
            renderer: None,
            presets: Vec::new(),
            preset: 0,
            mode: if supported {
                Mode::Renderer
            } else {
                Mode::Carousel
            },
            enabled: true,
            image: 0,
            image_shown_at: now_ms,
            size: (0, 0),
        }
    }

    pub fn supported(&self) -> bool {
        self.supported
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn attached(&self) -> bool {
        self.renderer.is_some()
    }

    pub fn can_toggle_mode(&self) -> bool {
        self.supported
    }

    /// Binds a freshly created renderer and loads the first preset.
    pub fn attach(&mut self, mut renderer: R) {
        if !self.supported {
            return;
        }

        self.presets = renderer.preset_names();
        self.preset = self.preset.min(self.presets.len().saturating_sub(1));
        if let Some(name) = self.presets.get(self.preset) {
            renderer.load_preset(name, 0.0);
        }
        let (width, height) = self.size;
        if width > 0 && height > 0 {
            renderer.set_size(width, height);
        }
        self.renderer = Some(renderer);
    }

    pub fn preset_name(&self) -> Option<&str> {
        self.presets.get(self.preset).map(String::as_str)
    }

    pub fn next_preset(&mut self) {
        self.step_preset(1);
    }

    pub fn previous_preset(&mut self) {
        self.step_preset(-1);
    }

    fn step_preset(&mut self, delta: isize) {
        if self.presets.is_empty() {
            return;
        }
        self.preset = wrap(self.preset, delta, self.presets.len());
        let name = self.presets.get(self.preset);
        if let (Some(renderer), Some(name)) = (self.renderer.as_mut(), name) {
            renderer.load_preset(name, PRESET_BLEND_SECONDS);
        }
    }

    pub fn toggle_mode(&mut self, now_ms: u64) {
        if !self.supported {
            return;
        }
        self.mode = match self.mode {
            Mode::Renderer => {
                self.image_shown_at = now_ms;
                Mode::Carousel
            }
            Mode::Carousel => Mode::Renderer,
        };
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if self.size == (width, height) {
            return;
        }
        self.size = (width, height);
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.set_size(width, height);
        }
    }

    pub fn should_render(&self) -> bool {
        self.enabled && self.mode == Mode::Renderer && self.renderer.is_some()
    }

    /// Draws one frame; `false` means the render loop should stop.
    pub fn frame(&mut self) -> bool {
        if !self.should_render() {
            return false;
        }
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.render();
        }
        true
    }

    pub fn image(&self) -> &'static str {
        CAROUSEL_IMAGES[self.image]
    }

    pub fn next_image(&mut self, now_ms: u64) {
        self.image = wrap(self.image, 1, CAROUSEL_IMAGES.len());
        self.image_shown_at = now_ms;
    }

    pub fn previous_image(&mut self, now_ms: u64) {
        self.image = wrap(self.image, -1, CAROUSEL_IMAGES.len());
        self.image_shown_at = now_ms;
    }

    /// Rotates the carousel while it is on screen.
    pub fn tick(&mut self, now_ms: u64) {
        if self.mode != Mode::Carousel || !self.enabled {
            return;
        }
        if now_ms.saturating_sub(self.image_shown_at) >= CAROUSEL_INTERVAL_MS {
            self.next_image(now_ms);
        }
    }
}

fn wrap(index: usize, delta: isize, len: usize) -> usize {
    (index as isize + delta).rem_euclid(len as isize) as usize
}
