use std::rc::Rc;

use js_sys::Function;
use log::{debug, info};
use seed::prelude::Orders;
use wasm_bindgen::convert::FromWasmAbi;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CloseEvent, MessageEvent, WebSocket};

#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    Opened,
    Text(String),
    Closed(u16),
    Failed,
}

type Notify = Rc<dyn Fn(SocketEvent)>;

/// A live websocket and its handlers. Dropping it detaches the handlers and
/// closes the socket, so no event reaches the app afterwards.
pub struct Subscription {
    socket: WebSocket,
    _on_open: Closure<dyn FnMut(JsValue)>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_close: Closure<dyn FnMut(CloseEvent)>,
    _on_error: Closure<dyn FnMut(JsValue)>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("url", &self.socket.url())
            .field("ready_state", &self.socket.ready_state())
            .finish()
    }
}

pub fn connect<Ms: 'static>(
    url: &str,
    orders: &mut impl Orders<Ms>,
    to_msg: fn(SocketEvent) -> Ms,
) -> Result<Subscription, JsValue> {
    info!("Opening websocket {}", url);
    let socket = WebSocket::new(url)?;

    let (app, msg_mapper) = (orders.clone_app(), orders.msg_mapper());
    let notify: Notify = Rc::new(move |event| app.update(msg_mapper(to_msg(event))));

    Ok(Subscription {
        _on_open: register_ws_handler(WebSocket::set_onopen, &socket, &notify, |_: JsValue| {
            Some(SocketEvent::Opened)
        }),
        _on_message: register_ws_handler(
            WebSocket::set_onmessage,
            &socket,
            &notify,
            |event: MessageEvent| match event.data().as_string() {
                Some(text) => Some(SocketEvent::Text(text)),
                None => {
                    debug!("ignoring binary websocket message");
                    None
                }
            },
        ),
        _on_close: register_ws_handler(WebSocket::set_onclose, &socket, &notify, |event: CloseEvent| {
            Some(SocketEvent::Closed(event.code()))
        }),
        _on_error: register_ws_handler(WebSocket::set_onerror, &socket, &notify, |_: JsValue| {
            Some(SocketEvent::Failed)
        }),
        socket,
    })
}

fn register_ws_handler<T, F>(
    ws_cb_setter: fn(&WebSocket, Option<&Function>),
    ws: &WebSocket,
    notify: &Notify,
    map: F,
) -> Closure<dyn FnMut(T)>
where
    T: FromWasmAbi + 'static,
    F: Fn(T) -> Option<SocketEvent> + 'static,
{
    let notify = Rc::clone(notify);
    let closure = Closure::wrap(Box::new(move |data: T| {
        if let Some(event) = map(data) {
            notify(event);
        }
    }) as Box<dyn FnMut(T)>);

    ws_cb_setter(ws, Some(closure.as_ref().unchecked_ref()));
    closure
}

impl Subscription {
    pub fn send(&self, text: &str) -> Result<(), JsValue> {
        self.socket.send_with_str(text)
    }

    /// Closes the socket but keeps the handlers, so the close event still arrives.
    pub fn close(&self) -> Result<(), JsValue> {
        self.socket.close()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.socket.set_onopen(None);
        self.socket.set_onmessage(None);
        self.socket.set_onclose(None);
        self.socket.set_onerror(None);

        if let Err(error) = self.socket.close() {
            debug!("websocket close failed: {:?}", error);
        }
    }
}
