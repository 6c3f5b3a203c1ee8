use log::{debug, warn};
use thiserror::Error;
use wasm_bindgen::JsValue;
use web_sys::{AudioContext, AudioContextState, HtmlAudioElement, MediaElementAudioSourceNode};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AudioGraphError {
    #[error("could not create an audio context: {0}")]
    Context(String),
    #[error("could not tap the audio element: {0}")]
    Tap(String),
}

fn describe(value: JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

/// The pieces of the browser audio stack the graph needs.
pub trait AudioPlatform {
    type Element: PartialEq + Clone;
    type Context: Clone;
    type Tap: Clone;

    fn create_context(&self) -> Result<Self::Context, AudioGraphError>;
    fn resume_if_suspended(&self, context: &Self::Context);
    /// Creates a source node for `element` routed to the context's speakers.
    fn create_tap(
        &self,
        context: &Self::Context,
        element: &Self::Element,
    ) -> Result<Self::Tap, AudioGraphError>;
    fn disconnect(&self, tap: &Self::Tap) -> Result<(), AudioGraphError>;
}

/// One audio context and at most one tap, shared by playback and the visualizer.
pub struct AudioGraph<P: AudioPlatform> {
    platform: P,
    context: Option<P::Context>,
    registered: Option<(P::Element, P::Tap)>,
}

impl<P: AudioPlatform> AudioGraph<P> {
    pub fn new(platform: P) -> Self {
        AudioGraph {
            platform,
            context: None,
            registered: None,
        }
    }

    pub fn context(&self) -> Option<&P::Context> {
        self.context.as_ref()
    }

    pub fn tap(&self) -> Option<&P::Tap> {
        self.registered.as_ref().map(|(_, tap)| tap)
    }

    /// Must run inside a user gesture the first time, browsers refuse to start
    /// a context otherwise.
    pub fn register(&mut self, element: &P::Element) -> Result<(), AudioGraphError> {
        if matches!(&self.registered, Some((registered, _)) if registered == element) {
            return Ok(());
        }

        let context = match &self.context {
            Some(context) => context.clone(),
            None => {
                let context = self.platform.create_context()?;
                self.context = Some(context.clone());
                context
            }
        };
        self.platform.resume_if_suspended(&context);

        self.unregister();

        let tap = self.platform.create_tap(&context, element).map_err(|error| {
            warn!("{}", error);
            error
        })?;
        self.registered = Some((element.clone(), tap));
        Ok(())
    }

    pub fn unregister(&mut self) {
        if let Some((_, tap)) = self.registered.take() {
            if let Err(error) = self.platform.disconnect(&tap) {
                debug!("tap already disconnected: {}", error);
            }
        }
    }
}

impl<P: AudioPlatform> Drop for AudioGraph<P> {
    fn drop(&mut self) {
        self.unregister();
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct WebAudio;

impl AudioPlatform for WebAudio {
    type Element = HtmlAudioElement;
    type Context = AudioContext;
    type Tap = MediaElementAudioSourceNode;

    fn create_context(&self) -> Result<AudioContext, AudioGraphError> {
        AudioContext::new().map_err(|error| AudioGraphError::Context(describe(error)))
    }

    fn resume_if_suspended(&self, context: &AudioContext) {
        if context.state() == AudioContextState::Suspended {
            if let Err(error) = context.resume() {
                warn!("could not resume audio context: {}", describe(error));
            }
        }
    }

    fn create_tap(
        &self,
        context: &AudioContext,
        element: &HtmlAudioElement,
    ) -> Result<MediaElementAudioSourceNode, AudioGraphError> {
        let tap = context
            .create_media_element_source(element)
            .map_err(|error| AudioGraphError::Tap(describe(error)))?;
        tap.connect_with_audio_node(&context.destination())
            .map_err(|error| AudioGraphError::Tap(describe(error)))?;
        Ok(tap)
    }

    fn disconnect(&self, tap: &MediaElementAudioSourceNode) -> Result<(), AudioGraphError> {
        tap.disconnect()
            .map_err(|error| AudioGraphError::Tap(describe(error)))
    }
}
