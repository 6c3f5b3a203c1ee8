use js_sys::{Object, Reflect};
use log::{debug, warn};
use wasm_bindgen::prelude::*;
use web_sys::{AudioContext, AudioNode, HtmlCanvasElement};

use crate::visualizer::Renderer;

#[wasm_bindgen]
extern "C" {
    type Visualizer;

    #[wasm_bindgen(js_namespace = butterchurn, js_name = createVisualizer, catch)]
    fn create_visualizer(
        context: &AudioContext,
        canvas: &HtmlCanvasElement,
        options: &Object,
    ) -> Result<Visualizer, JsValue>;

    #[wasm_bindgen(method, js_name = connectAudio)]
    fn connect_audio(this: &Visualizer, node: &AudioNode);

    #[wasm_bindgen(method, js_name = disconnectAudio, catch)]
    fn disconnect_audio(this: &Visualizer, node: &AudioNode) -> Result<(), JsValue>;

    #[wasm_bindgen(method, js_name = loadPreset)]
    fn load_preset(this: &Visualizer, preset: &JsValue, blend_seconds: f64);

    #[wasm_bindgen(method, js_name = setRendererSize)]
    fn set_renderer_size(this: &Visualizer, width: u32, height: u32);

    #[wasm_bindgen(method)]
    fn render(this: &Visualizer);

    #[wasm_bindgen(js_namespace = butterchurnPresets, js_name = getPresets, catch)]
    fn get_presets() -> Result<Object, JsValue>;

    #[wasm_bindgen(js_name = isButterchurnSupported, catch)]
    fn is_butterchurn_supported() -> Result<bool, JsValue>;
}

/// Missing scripts count as unsupported.
pub fn supported() -> bool {
    match is_butterchurn_supported() {
        Ok(supported) => supported,
        Err(error) => {
            warn!("butterchurn support check failed: {:?}", error);
            false
        }
    }
}

pub struct ButterchurnRenderer {
    visualizer: Visualizer,
    presets: Object,
    tap: AudioNode,
}

impl ButterchurnRenderer {
    pub fn new(
        context: &AudioContext,
        canvas: &HtmlCanvasElement,
        tap: &AudioNode,
        width: u32,
        height: u32,
    ) -> Result<Self, JsValue> {
        let options = Object::new();
        Reflect::set(&options, &"width".into(), &width.into())?;
        Reflect::set(&options, &"height".into(), &height.into())?;

        let visualizer = create_visualizer(context, canvas, &options)?;
        visualizer.connect_audio(tap);

        Ok(ButterchurnRenderer {
            visualizer,
            presets: get_presets()?,
            tap: tap.clone(),
        })
    }
}

impl Renderer for ButterchurnRenderer {
    fn preset_names(&self) -> Vec<String> {
        Object::keys(&self.presets)
            .iter()
            .filter_map(|key| key.as_string())
            .collect()
    }

    fn load_preset(&mut self, name: &str, blend_seconds: f64) {
        match Reflect::get(&self.presets, &JsValue::from_str(name)) {
            Ok(preset) if !preset.is_undefined() => {
                debug!("loading preset {}", name);
                self.visualizer.load_preset(&preset, blend_seconds);
            }
            _ => warn!("unknown preset {}", name),
        }
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.visualizer.set_renderer_size(width, height);
    }

    fn render(&mut self) {
        self.visualizer.render();
    }
}

impl Drop for ButterchurnRenderer {
    fn drop(&mut self) {
        if self.visualizer.disconnect_audio(&self.tap).is_err() {
            debug!("visualizer audio already disconnected");
        }
    }
}
