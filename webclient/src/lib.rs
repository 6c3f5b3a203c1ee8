use gloo::timers::future::TimeoutFuture;
use log::{debug, error, info, warn};
use seed::{prelude::*, *};
use shared::events::{Input, Output};
use shared::model::{Notice, Track};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{HtmlAudioElement, HtmlCanvasElement, Storage};

pub mod api;
pub mod audio;
pub mod butterchurn;
pub mod chat;
pub mod config;
pub mod connection;
pub mod pages;
pub mod playback;
pub mod queue;
pub mod registration;
pub mod session;
pub mod transport;
pub mod visualizer;

use api::ApiError;
use audio::{AudioGraph, WebAudio};
use butterchurn::ButterchurnRenderer;
use chat::{ChatEntry, ChatView, Compose, EntryKind, MAX_DRAFT_CHARS};
use config::Endpoints;
use connection::{Connection, ConnectionEvent};
use pages::Page;
use playback::{AudioCommand, PlaybackSync};
use queue::QueueView;
use registration::{avatar_url, RegistrationForm, AVATAR_IDS, MAX_NAME_CHARS};
use session::{SessionError, SessionIdentity};
use transport::{SocketEvent, Subscription};
use visualizer::{Mode, Visualization};

const TICK_MS: u32 = 50;

fn now_ms() -> u64 {
    js_sys::Date::now() as u64
}

struct Model {
    storage: Option<Storage>,
    endpoints: Option<Endpoints>,
    data: Data,
}

enum Data {
    Misconfigured(String),
    Registration(RegistrationModel),
    Room(Box<RoomModel>),
}

#[derive(Default)]
struct RegistrationModel {
    form: RegistrationForm,
    returning: Option<SessionIdentity>,
}

/// Everything that lives only while the listening room is open. Dropping it
/// closes the socket, stops the scheduler and releases the audio tap.
struct RoomModel {
    identity: SessionIdentity,
    endpoints: Endpoints,
    connection: Connection,
    subscription: Option<Subscription>,
    socket_generation: u32,
    playback: PlaybackSync,
    queue: QueueView,
    chat: ChatView,
    visualization: Visualization<ButterchurnRenderer>,
    audio_graph: AudioGraph<WebAudio>,
    audio: ElRef<HtmlAudioElement>,
    canvas: ElRef<HtmlCanvasElement>,
    dragging: Option<usize>,
    render_loop: bool,
    _ticker: StreamHandle,
    _resize: StreamHandle,
}

#[derive(Debug)]
enum Msg {
    UrlChanged(Url),

    NameChanged(String),
    AvatarPicked(u32),
    Register,
    Registered(Result<shared::model::User, ApiError>),

    Socket(SocketEvent),
    Reconnect(u32),
    Tick,
    Resized,
    Leave,

    QueueFetched(Result<shared::model::QueueSnapshot, ApiError>),
    RadioStatusFetched(Result<shared::model::PlaybackState, ApiError>),
    AddToQueue(String),
    Added(String, Result<(), ApiError>),
    DragStarted(usize),
    DragEnded,
    DroppedOnTrash,
    Removed(Result<(), ApiError>),

    DraftChanged(String),
    SendDraft,
    SearchFetched(String, Result<Vec<Track>, ApiError>),

    TuneIn,
    AudioPlaying,
    AudioInterrupted,
    PlayRejected(Option<String>),

    RenderFrame,
    ToggleVisualizer,
    ToggleMode,
    NextPreset,
    PreviousPreset,
    NextImage,
    PreviousImage,
}

fn init(url: Url, orders: &mut impl Orders<Msg>) -> Model {
    orders.subscribe(|subs::UrlChanged(url)| Msg::UrlChanged(url));

    let storage = web_sys::window().and_then(|window| window.local_storage().ok().flatten());
    if storage.is_none() {
        warn!("local storage is unavailable, sessions will not persist");
    }

    let mut model = match Endpoints::from_env() {
        Ok(endpoints) => Model {
            storage,
            endpoints: Some(endpoints),
            data: Data::Registration(RegistrationModel::default()),
        },
        Err(error) => {
            error!("BACKEND_URL {:?} is unusable: {}", config::BACKEND_URL, error);
            Model {
                storage,
                endpoints: None,
                data: Data::Misconfigured(error.to_string()),
            }
        }
    };

    enter(Page::from_url(url).unwrap_or(Page::Home), &mut model, orders);
    model
}

fn enter(page: Page, model: &mut Model, orders: &mut impl Orders<Msg>) {
    let endpoints = match &model.endpoints {
        Some(endpoints) => endpoints.clone(),
        None => return,
    };
    let identity = model
        .storage
        .as_ref()
        .and_then(|storage| session::load(storage));

    match (page, identity) {
        (Page::Radio, Some(identity)) => {
            if !matches!(model.data, Data::Room(_)) {
                info!("Entering the room as {}", identity.display_name);
                model.data = Data::Room(Box::new(RoomModel::open(identity, endpoints, orders)));
            }
        }
        (Page::Radio, None) => {
            info!("No stored identity, redirecting to registration");
            navigate(Page::Home, model, orders);
        }
        (Page::Home, returning) => {
            model.data = Data::Registration(RegistrationModel {
                form: RegistrationForm::default(),
                returning,
            });
        }
    }
}

fn navigate(page: Page, model: &mut Model, orders: &mut impl Orders<Msg>) {
    page.url().go_and_push();
    enter(page, model, orders);
}

fn update(msg: Msg, model: &mut Model, orders: &mut impl Orders<Msg>) {
    match msg {
        Msg::UrlChanged(url) => enter(Page::from_url(url).unwrap_or(Page::Home), model, orders),
        Msg::Leave => {
            if let Some(storage) = &model.storage {
                if let Err(error) = session::clear(storage) {
                    warn!("could not clear session: {}", error);
                }
            }
            navigate(Page::Home, model, orders);
        }
        msg => {
            let next = match &mut model.data {
                Data::Registration(registration) => registration_update(
                    msg,
                    registration,
                    model.storage.as_ref(),
                    model.endpoints.as_ref(),
                    orders,
                ),
                Data::Room(room) => {
                    room_update(msg, room, orders);
                    None
                }
                Data::Misconfigured(_) => None,
            };
            if let Some(page) = next {
                navigate(page, model, orders);
            }
        }
    }
}

fn registration_update(
    msg: Msg,
    registration: &mut RegistrationModel,
    storage: Option<&Storage>,
    endpoints: Option<&Endpoints>,
    orders: &mut impl Orders<Msg>,
) -> Option<Page> {
    let form = &mut registration.form;

    match msg {
        Msg::NameChanged(name) => {
            form.name = name;
            form.error = None;
        }
        Msg::AvatarPicked(avatar_id) => {
            form.avatar = Some(avatar_id);
            form.error = None;
        }
        Msg::Register => {
            if form.submitting {
                return None;
            }
            let endpoints = match endpoints {
                Some(endpoints) => endpoints,
                None => return None,
            };

            match form.validate() {
                Ok(request) => {
                    form.submitting = true;
                    let url = endpoints.register();
                    orders.perform_cmd(async move {
                        Msg::Registered(api::register(url, request).await)
                    });
                }
                Err(error) => form.error = Some(error.to_string()),
            }
        }
        Msg::Registered(Ok(user)) => {
            form.submitting = false;
            let saved = storage
                .ok_or(SessionError::Unavailable)
                .and_then(|storage| session::save(storage, &user));

            match saved {
                Ok(identity) => {
                    info!("Registered as {} ({})", identity.display_name, identity.user_id);
                    return Some(Page::Radio);
                }
                Err(error) => {
                    error!("could not store session: {}", error);
                    form.error = Some(error.to_string());
                }
            }
        }
        Msg::Registered(Err(error)) => {
            form.submitting = false;
            warn!("registration failed: {}", error);
            form.error = Some("Failed to set up user. Please try again.".into());
        }
        _ => {}
    }
    None
}

impl RoomModel {
    fn open(identity: SessionIdentity, endpoints: Endpoints, orders: &mut impl Orders<Msg>) -> Self {
        let now = now_ms();
        let mut room = RoomModel {
            playback: PlaybackSync::new(endpoints.stream()),
            connection: Connection::default(),
            subscription: None,
            socket_generation: 0,
            queue: QueueView::default(),
            chat: ChatView::default(),
            visualization: Visualization::new(butterchurn::supported(), now),
            audio_graph: AudioGraph::new(WebAudio),
            audio: ElRef::default(),
            canvas: ElRef::default(),
            dragging: None,
            render_loop: false,
            _ticker: orders.stream_with_handle(streams::interval(TICK_MS, || Msg::Tick)),
            _resize: orders.stream_with_handle(streams::window_event(Ev::Resize, |_| Msg::Resized)),
            identity,
            endpoints,
        };

        room.connect(orders);
        room.fetch_queue(orders);

        let url = room.endpoints.radio_status();
        orders.perform_cmd(async move { Msg::RadioStatusFetched(api::radio_status(url).await) });

        room
    }

    fn connect(&mut self, orders: &mut impl Orders<Msg>) {
        match transport::connect(&self.endpoints.socket(), orders, Msg::Socket) {
            Ok(subscription) => self.subscription = Some(subscription),
            Err(error) => {
                error!("could not open websocket: {:?}", error);
                self.schedule_reconnect(orders);
            }
        }
    }

    fn schedule_reconnect(&mut self, orders: &mut impl Orders<Msg>) {
        let delay = self.connection.on_close();
        self.socket_generation += 1;
        let generation = self.socket_generation;
        // The close handler that got us here belongs to this subscription,
        // so it is released from the timer instead.
        let retired = self.subscription.take();

        info!("Reconnecting in {}ms", delay);
        orders.perform_cmd(async move {
            TimeoutFuture::new(delay).await;
            drop(retired);
            Msg::Reconnect(generation)
        });
    }

    fn fetch_queue(&mut self, orders: &mut impl Orders<Msg>) {
        self.queue.begin_fetch();
        let url = self.endpoints.queue();
        orders.perform_cmd(async move { Msg::QueueFetched(api::fetch_queue(url).await) });
    }

    fn send(&self, frame: &str) {
        match &self.subscription {
            Some(subscription) => {
                if let Err(error) = subscription.send(frame) {
                    warn!("websocket send failed: {:?}", error);
                }
            }
            None => debug!("no socket for {}", frame),
        }
    }

    fn emit(&self, input: &Input) {
        if let Some(frame) = self.connection.emit(input) {
            self.send(&frame);
        }
    }

    fn on_connection_event(&mut self, event: ConnectionEvent, now: u64, orders: &mut impl Orders<Msg>) {
        match event {
            ConnectionEvent::Connected => {
                if let Some(frame) = self.connection.authenticate(&self.identity.user_id) {
                    self.send(&frame);
                }
                for input in [
                    Input::RequestCurrentSong,
                    Input::RequestProgress,
                    Input::RequestRadioState,
                ] {
                    self.emit(&input);
                }
                self.fetch_queue(orders);
            }
            ConnectionEvent::Disconnected => {
                info!("Disconnected from server");
                if let Some(subscription) = &self.subscription {
                    if let Err(error) = subscription.close() {
                        warn!("websocket close failed: {:?}", error);
                    }
                }
            }
            ConnectionEvent::Push(output) => self.apply_push(output, now, orders),
        }
    }

    fn apply_push(&mut self, output: Output, now: u64, orders: &mut impl Orders<Msg>) {
        let commands = match output {
            Output::ChatHistory(messages) => {
                self.chat.set_history(messages, now);
                Vec::new()
            }
            Output::NewMessage(message) => {
                self.chat.push_message(message, now);
                Vec::new()
            }
            Output::MessageError(notice) => {
                self.chat.push_notice(notice, now);
                Vec::new()
            }
            Output::UserTyping(notice) => {
                self.chat.set_typist(notice, &self.identity.user_id);
                Vec::new()
            }
            Output::PlaylistUpdate(tracks) => {
                self.queue.apply_playlist(tracks);
                Vec::new()
            }
            Output::RadioUpdate(state) => {
                let commands = self.playback.apply(state, now);
                self.queue.follow_playback(self.playback.track());
                commands
            }
            Output::ProgressUpdate(state) => {
                let commands = self.playback.apply_progress(state, now);
                self.queue.follow_playback(self.playback.track());
                commands
            }
            Output::CurrentSongUpdate(track) => {
                self.queue.set_current(track.clone());
                self.playback.apply_current_track(track, now)
            }
            Output::ListenerUpdate(count) => {
                self.playback.set_listener_count(count);
                Vec::new()
            }
            Output::AuthSuccess | Output::AuthError(_) => Vec::new(),
            Output::Unknown(name) => {
                debug!("ignoring unknown event {}", name);
                Vec::new()
            }
        };

        self.run_audio(commands, orders);
    }

    fn run_audio(&mut self, commands: Vec<AudioCommand>, orders: &mut impl Orders<Msg>) {
        if commands.is_empty() {
            return;
        }
        let audio = match self.audio.get() {
            Some(audio) => audio,
            None => {
                warn!("audio element is not mounted");
                return;
            }
        };

        for command in commands {
            match command {
                AudioCommand::Load { url } => {
                    debug!("loading stream {}", url);
                    audio.set_src(&url);
                    audio.load();
                }
                AudioCommand::Play => match audio.play() {
                    Ok(promise) => {
                        orders.perform_cmd(async move {
                            JsFuture::from(promise).await.err().map(|error| {
                                let name = js_sys::Reflect::get(&error, &"name".into())
                                    .ok()
                                    .and_then(|name| name.as_string());
                                Msg::PlayRejected(name)
                            })
                        });
                    }
                    Err(error) => error!("play() failed: {:?}", error),
                },
                AudioCommand::Pause => {
                    if let Err(error) = audio.pause() {
                        warn!("pause() failed: {:?}", error);
                    }
                }
            }
        }
    }

    fn attach_renderer(&mut self) {
        if !self.visualization.supported() || self.visualization.attached() {
            return;
        }
        let (context, tap, canvas) = match (
            self.audio_graph.context(),
            self.audio_graph.tap(),
            self.canvas.get(),
        ) {
            (Some(context), Some(tap), Some(canvas)) => (context, tap, canvas),
            _ => return,
        };

        let (width, height) = fit_canvas(&canvas);
        match ButterchurnRenderer::new(context, &canvas, tap, width, height) {
            Ok(renderer) => {
                self.visualization.resize(width, height);
                self.visualization.attach(renderer);
                info!("visualizer running at {}x{}", width, height);
            }
            Err(error) => warn!("could not start visualizer: {:?}", error),
        }
    }

    fn start_render_loop(&mut self, orders: &mut impl Orders<Msg>) {
        if !self.render_loop && self.visualization.should_render() {
            self.render_loop = true;
            orders.after_next_render(|_| Msg::RenderFrame);
        }
    }
}

fn fit_canvas(canvas: &HtmlCanvasElement) -> (u32, u32) {
    let width = canvas.client_width().max(1) as u32;
    let height = canvas.client_height().max(1) as u32;
    canvas.set_width(width);
    canvas.set_height(height);
    (width, height)
}

fn room_update(msg: Msg, room: &mut RoomModel, orders: &mut impl Orders<Msg>) {
    let now = now_ms();

    match msg {
        Msg::Socket(SocketEvent::Opened) => room.connection.on_open(),
        Msg::Socket(SocketEvent::Text(text)) => match room.connection.receive(&text) {
            Ok(step) => {
                for frame in &step.outbound {
                    room.send(frame);
                }
                for event in step.events {
                    room.on_connection_event(event, now, orders);
                }
            }
            Err(error) => warn!("dropping frame {:?}: {}", text, error),
        },
        Msg::Socket(SocketEvent::Closed(code)) => {
            info!("WebSocket connection was closed ({})", code);
            room.schedule_reconnect(orders);
        }
        Msg::Socket(SocketEvent::Failed) => warn!("WebSocket error"),
        Msg::Reconnect(generation) => {
            if generation == room.socket_generation && room.subscription.is_none() {
                room.connect(orders);
            }
        }
        Msg::Tick => {
            room.playback.tick(now);
            room.queue.expire(now);
            if let Some(is_typing) = room.chat.tick(now) {
                room.emit(&Input::Typing { is_typing });
            }
            room.visualization.tick(now);
        }
        Msg::Resized => {
            if let Some(canvas) = room.canvas.get() {
                let (width, height) = fit_canvas(&canvas);
                room.visualization.resize(width, height);
            }
        }

        Msg::QueueFetched(Ok(snapshot)) => room.queue.replace_snapshot(snapshot),
        Msg::QueueFetched(Err(error)) => {
            warn!("queue fetch failed: {}", error);
            room.queue.fetch_failed(error.to_string());
        }
        Msg::RadioStatusFetched(Ok(state)) => {
            let commands = room.playback.apply(state, now);
            room.queue.follow_playback(room.playback.track());
            room.run_audio(commands, orders);
        }
        Msg::RadioStatusFetched(Err(error)) => warn!("radio status failed: {}", error),
        Msg::AddToQueue(track_id) => match room.queue.begin_add(&track_id, now) {
            Ok(()) => {
                let url = room.endpoints.queue();
                orders.perform_cmd(async move {
                    let result = api::add_to_queue(url, track_id.clone()).await;
                    Msg::Added(track_id, result)
                });
            }
            Err(rejection) => room.chat.push_notice(
                Notice {
                    message: rejection.to_string(),
                },
                now,
            ),
        },
        Msg::Added(track_id, Ok(())) => info!("Queued {}", track_id),
        Msg::Added(track_id, Err(error)) => {
            warn!("adding {} failed: {}", track_id, error);
            room.chat.push_notice(
                Notice {
                    message: format!("Could not add that song: {}", error),
                },
                now,
            );
        }
        Msg::DragStarted(index) => room.dragging = Some(index),
        Msg::DragEnded => room.dragging = None,
        Msg::DroppedOnTrash => {
            if let Some(index) = room.dragging.take() {
                match room.queue.removal_target(index) {
                    Some(track) => {
                        info!("Removing {} from the queue", track.title);
                        let url = room.endpoints.queue_entry(index);
                        orders.perform_cmd(async move {
                            Msg::Removed(api::remove_from_queue(url).await)
                        });
                    }
                    None => debug!("nothing queued at {}", index),
                }
            }
        }
        Msg::Removed(Ok(())) => {}
        Msg::Removed(Err(error)) => {
            warn!("removal failed: {}", error);
            room.chat.push_notice(
                Notice {
                    message: format!("Could not remove that song: {}", error),
                },
                now,
            );
        }

        Msg::DraftChanged(text) => {
            if let Some(is_typing) = room.chat.edit_draft(text, now) {
                room.emit(&Input::Typing { is_typing });
            }
        }
        Msg::SendDraft => {
            let (compose, typing) = room.chat.submit(room.connection.authenticated());
            if let Some(is_typing) = typing {
                room.emit(&Input::Typing { is_typing });
            }
            match compose {
                Compose::Ignore => {}
                Compose::Message(message) => room.emit(&Input::SendMessage { message }),
                Compose::Search(query) => {
                    let url = room.endpoints.search(&query);
                    orders.perform_cmd(async move {
                        let result = api::search(url).await;
                        Msg::SearchFetched(query, result)
                    });
                }
            }
        }
        Msg::SearchFetched(query, Ok(tracks)) => room.chat.push_search_results(query, tracks, now),
        Msg::SearchFetched(query, Err(error)) => {
            warn!("search for {:?} failed: {}", query, error);
            room.chat.push_notice(
                Notice {
                    message: format!("Search failed: {}", error),
                },
                now,
            );
        }

        Msg::TuneIn => {
            let audio = match room.audio.get() {
                Some(audio) => audio,
                None => return,
            };
            if let Err(error) = room.audio_graph.register(&audio) {
                warn!("audio graph unavailable: {}", error);
            }
            let commands = room.playback.enable_audio();
            room.run_audio(commands, orders);
            room.attach_renderer();
            room.start_render_loop(orders);
        }
        Msg::AudioPlaying => room.playback.on_audible(now),
        Msg::AudioInterrupted => {
            let commands = room.playback.on_interrupted();
            room.run_audio(commands, orders);
        }
        Msg::PlayRejected(name) => {
            if name.as_deref() == Some("NotAllowedError") {
                warn!("playback blocked until the next user gesture");
                room.playback.audio_blocked();
            } else {
                debug!("play() interrupted: {:?}", name);
            }
        }

        Msg::RenderFrame => {
            if room.visualization.frame() {
                orders.after_next_render(|_| Msg::RenderFrame);
            } else {
                room.render_loop = false;
            }
        }
        Msg::ToggleVisualizer => {
            let enabled = !room.visualization.enabled();
            room.visualization.set_enabled(enabled);
            room.start_render_loop(orders);
        }
        Msg::ToggleMode => {
            room.visualization.toggle_mode(now);
            room.start_render_loop(orders);
        }
        Msg::NextPreset => room.visualization.next_preset(),
        Msg::PreviousPreset => room.visualization.previous_preset(),
        Msg::NextImage => room.visualization.next_image(now),
        Msg::PreviousImage => room.visualization.previous_image(now),

        _ => {}
    }
}

// ------ ------
//     View
// ------ ------

fn avatar_src(avatar: &str) -> String {
    avatar
        .parse::<u32>()
        .map(avatar_url)
        .unwrap_or_else(|_| avatar.to_string())
}

fn registration_view(registration: &RegistrationModel) -> Node<Msg> {
    let form = &registration.form;

    div![
        C!["registration"],
        h1!["Welcome to Live Radio"],
        label![attrs! {At::For => "name"}, "Enter your name:"],
        input![
            attrs! {
                At::Id => "name",
                At::Value => &form.name,
                At::MaxLength => MAX_NAME_CHARS,
                At::Placeholder => "Your name",
            },
            input_ev(Ev::Input, Msg::NameChanged),
            keyboard_ev(Ev::KeyDown, |event| IF!(event.key() == "Enter" => Msg::Register)),
        ],
        p!["Choose your avatar:"],
        div![
            C!["avatars"],
            AVATAR_IDS.iter().map(|&avatar_id| {
                img![
                    C!["avatar", IF!(form.avatar == Some(avatar_id) => "selected")],
                    attrs! {
                        At::Src => avatar_url(avatar_id),
                        At::Alt => format!("Avatar {}", avatar_id),
                    },
                    ev(Ev::Click, move |_| Msg::AvatarPicked(avatar_id)),
                ]
            }),
        ],
        form.error.as_deref().map(|error| p![C!["error"], error]),
        button![
            if form.submitting { "Joining…" } else { "Continue" },
            attrs! {At::Disabled => (!form.can_submit()).as_at_value()},
            ev(Ev::Click, |_| Msg::Register),
        ],
        registration.returning.as_ref().map(|identity| {
            a![
                C!["rejoin"],
                attrs! {At::Href => "#radio"},
                format!("Rejoin as {}", identity.display_name),
            ]
        }),
    ]
}

fn header_view(room: &RoomModel) -> Node<Msg> {
    header![
        C!["room-header"],
        h1!["Live Radio"],
        span![
            C!["status", IF!(room.connection.authenticated() => "live")],
            room.connection.status_label(),
        ],
        span![
            C!["listeners"],
            format!("{} listening", room.playback.listener_count()),
        ],
        div![
            C!["identity"],
            IF!(!room.identity.avatar.is_empty() => img![
                C!["avatar"],
                attrs! {At::Src => &room.identity.avatar, At::Alt => &room.identity.display_name},
            ]),
            b![room.identity.display_name.as_str()],
            button!["Leave", ev(Ev::Click, |_| Msg::Leave)],
        ],
    ]
}

fn player_view(room: &RoomModel) -> Node<Msg> {
    let playback = &room.playback;

    div![
        C!["player"],
        h2![
            "Now Playing",
            if playback.is_playing() {
                span![C!["live"], " (Live)"]
            } else if playback.track().is_some() {
                span![C!["paused"], " (Paused)"]
            } else {
                empty![]
            },
        ],
        match playback.track() {
            Some(track) => div![
                h3![track.title.as_str()],
                p![track.artist.as_str()],
                track
                    .album
                    .as_deref()
                    .map(|album| p![C!["album"], format!("from {}", album)]),
                div![
                    C!["progress"],
                    div![
                        C!["progress-bar"],
                        style! {St::Width => format!("{:.1}%", playback.progress_percent())},
                    ],
                ],
                div![
                    C!["clock"],
                    span![playback.formatted_elapsed()],
                    span![playback.formatted_duration()],
                ],
            ],
            None => div![
                C!["idle"],
                p!["No song currently playing"],
                p![C!["hint"], "Add songs to the queue to start listening!"],
            ],
        },
        IF!(!playback.audio_enabled() => button![
            C!["tune-in"],
            "▶ Tune in",
            ev(Ev::Click, |_| Msg::TuneIn),
        ]),
        audio![
            el_ref(&room.audio),
            attrs! {At::Preload => "none"},
            ev(Ev::Playing, |_| Msg::AudioPlaying),
            ev(Ev::Ended, |_| Msg::AudioInterrupted),
            ev(Ev::Stalled, |_| Msg::AudioInterrupted),
            ev(Ev::Error, |_| Msg::AudioInterrupted),
        ],
    ]
}

fn visualization_view(room: &RoomModel) -> Node<Msg> {
    let visualization = &room.visualization;
    let carousel = visualization.mode() == Mode::Carousel;
    let enabled = visualization.enabled();

    div![
        C!["visualization"],
        canvas![
            el_ref(&room.canvas),
            C!["visualizer"],
            style! {St::Display => if carousel || !enabled { "none" } else { "block" }},
        ],
        IF!(carousel && enabled => img![
            C!["carousel"],
            attrs! {At::Src => visualization.image(), At::Alt => "Music Visualization"},
        ]),
        IF!(!enabled => p![C!["hint"], "Visualizer off"]),
        IF!(enabled && !carousel && !visualization.attached() => p![
            C!["hint"],
            "Tune in to start the visualizer",
        ]),
        div![
            C!["controls"],
            button![
                if enabled { "Off" } else { "On" },
                ev(Ev::Click, |_| Msg::ToggleVisualizer),
            ],
            button![
                if carousel { "Visualizer" } else { "Images" },
                attrs! {At::Disabled => (!visualization.can_toggle_mode()).as_at_value()},
                ev(Ev::Click, |_| Msg::ToggleMode),
            ],
            if carousel {
                vec![
                    button!["◀", ev(Ev::Click, |_| Msg::PreviousImage)],
                    button!["▶", ev(Ev::Click, |_| Msg::NextImage)],
                ]
            } else {
                vec![
                    button!["◀", ev(Ev::Click, |_| Msg::PreviousPreset)],
                    span![C!["preset"], visualization.preset_name().unwrap_or_default()],
                    button!["▶", ev(Ev::Click, |_| Msg::NextPreset)],
                ]
            },
        ],
    ]
}

fn queue_entry_view(index: usize, track: &Track, dragging: bool) -> Node<Msg> {
    li![
        C!["queue-entry", IF!(dragging => "dragging")],
        attrs! {At::Draggable => "true"},
        ev(Ev::DragStart, move |event| {
            if let Some(transfer) = event
                .dyn_ref::<web_sys::DragEvent>()
                .and_then(|event| event.data_transfer())
            {
                transfer.set_data("text/plain", &index.to_string()).ok();
            }
            Msg::DragStarted(index)
        }),
        ev(Ev::DragEnd, |_| Msg::DragEnded),
        track.thumbnail_url.as_deref().map(|src| {
            img![C!["thumb"], attrs! {At::Src => src, At::Alt => &track.artist}]
        }),
        span![C!["position"], (index + 1).to_string()],
        div![
            p![C!["title"], track.title.as_str()],
            p![C!["artist"], track.artist.as_str()],
        ],
    ]
}

fn queue_view(room: &RoomModel) -> Node<Msg> {
    let queue = &room.queue;

    div![
        C!["queue"],
        h2!["Up Next"],
        IF!(queue.loading() => p![C!["hint"], "Loading…"]),
        queue.last_error().map(|error| p![C!["error"], error]),
        if queue.tracks().is_empty() {
            p![C!["hint"], "The queue is empty. Try /search in the chat."]
        } else {
            ol![queue
                .tracks()
                .iter()
                .enumerate()
                .map(|(index, track)| queue_entry_view(index, track, room.dragging == Some(index)))]
        },
        div![
            C!["trash", IF!(room.dragging.is_some() => "active")],
            "Drop a song here to remove it",
            ev(Ev::DragOver, |event| event.prevent_default()),
            ev(Ev::Drop, |event| {
                event.prevent_default();
                Msg::DroppedOnTrash
            }),
        ],
    ]
}

fn search_result_view(track: &Track, queue: &QueueView) -> Node<Msg> {
    let (label, disabled) = if queue.is_adding(&track.id) {
        ("Adding…", true)
    } else if queue.is_in_queue(&track.id) {
        ("Queued", true)
    } else {
        ("Add", false)
    };
    let track_id = track.id.clone();

    li![
        C!["search-result"],
        track.thumbnail_url.as_deref().map(|src| {
            img![C!["thumb"], attrs! {At::Src => src, At::Alt => &track.title}]
        }),
        span![format!("{} - {}", track.title, track.artist)],
        button![
            label,
            attrs! {At::Disabled => disabled.as_at_value()},
            ev(Ev::Click, move |_| Msg::AddToQueue(track_id)),
        ],
    ]
}

fn chat_entry_view(entry: &ChatEntry, queue: &QueueView) -> Node<Msg> {
    let class = match entry.kind {
        EntryKind::Remote => "message",
        EntryKind::SearchResults { .. } => "search-results",
        EntryKind::Notice => "notice",
    };

    div![
        C!["chat-entry", class],
        span![C!["text"], entry.displayed()],
        entry
            .message
            .timestamp
            .as_deref()
            .and_then(chat::clock_label)
            .map(|label| span![C!["time"], label]),
        match &entry.kind {
            EntryKind::SearchResults { tracks, .. } if !entry.is_animating() => {
                Some(ul![tracks.iter().map(|track| search_result_view(track, queue))])
            }
            _ => None,
        },
    ]
}

fn chat_view(room: &RoomModel) -> Node<Msg> {
    let authenticated = room.connection.authenticated();
    let groups = room.chat.groups();
    let typists: Vec<&str> = room.chat.typists().collect();

    div![
        C!["chat"],
        h2!["Chat"],
        div![
            C!["chat-log"],
            groups.iter().map(|group| {
                div![
                    C!["chat-group"],
                    div![
                        C!["chat-sender"],
                        group.avatar.map(|avatar| img![
                            C!["avatar"],
                            attrs! {At::Src => avatar_src(avatar), At::Alt => group.username},
                        ]),
                        b![group.username],
                    ],
                    group
                        .entries
                        .iter()
                        .map(|entry| chat_entry_view(entry, &room.queue)),
                ]
            }),
        ],
        IF!(!typists.is_empty() => p![
            C!["typing"],
            format!(
                "{} {} typing…",
                typists.join(", "),
                if typists.len() == 1 { "is" } else { "are" }
            ),
        ]),
        div![
            C!["chat-compose"],
            input![
                attrs! {
                    At::Value => room.chat.draft(),
                    At::MaxLength => MAX_DRAFT_CHARS,
                    At::Placeholder => if authenticated {
                        "Say something, or /search a song"
                    } else {
                        room.connection.status_label()
                    },
                },
                input_ev(Ev::Input, Msg::DraftChanged),
                keyboard_ev(Ev::KeyDown, |event| IF!(event.key() == "Enter" => Msg::SendDraft)),
            ],
            button![
                "Send",
                attrs! {At::Disabled => (!authenticated).as_at_value()},
                ev(Ev::Click, |_| Msg::SendDraft),
            ],
        ],
    ]
}

fn room_view(room: &RoomModel) -> Node<Msg> {
    div![
        C!["room"],
        header_view(room),
        div![
            C!["room-main"],
            div![C!["stage"], player_view(room), visualization_view(room), queue_view(room)],
            chat_view(room),
        ],
    ]
}

fn view(model: &Model) -> Node<Msg> {
    match &model.data {
        Data::Misconfigured(reason) => div![
            C!["error-page"],
            h1!["Configuration error"],
            p![format!("The backend address is invalid: {}", reason)],
        ],
        Data::Registration(registration) => registration_view(registration),
        Data::Room(room) => room_view(room),
    }
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if let Err(error) = console_log::init_with_level(log::Level::Debug) {
        web_sys::console::error_1(&error.to_string().into());
    }

    App::start("app", init, update, view);
}
