use std::cell::RefCell;

use leptos::html;
use leptos::prelude::*;
use shared::fsm::RaceState;
use shared::passages::passage_for_seed;
use shared::protocol::{EventInfo, PlayerRegistration, ScoreEntry};
use shared::race::{Liveness, PlayerIdentity, RaceView, ScoreApi};
use shared::ranking::{is_own_result, HighscoreQuery, DEFAULT_LIMIT};
use shared::typing::CharMark;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{EventSource, MessageEvent};

use crate::api::ApiClient;
use crate::session;

// The active-event stream is not Send, so it is kept out of the reactive
// tree the same way the race session is.
thread_local! {
    static ACTIVE_STREAM: RefCell<Option<EventSource>> = const { RefCell::new(None) };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    Signup,
    Race,
    Highscores,
}

fn subscribe_active_event(set_event: WriteSignal<Option<EventInfo>>) {
    let source = match EventSource::new("/api/events/active/stream") {
        Ok(source) => source,
        Err(_) => {
            web_sys::console::error_1(&"Failed to open the active-event stream".into());
            return;
        }
    };
    let on_active = Closure::wrap(Box::new(move |e: MessageEvent| {
        let Some(text) = e.data().as_string() else {
            return;
        };
        match serde_json::from_str::<EventInfo>(&text) {
            Ok(event) => set_event.set(Some(event)),
            Err(err) => web_sys::console::warn_1(&format!("bad active event: {err}").into()),
        }
    }) as Box<dyn FnMut(_)>);
    if source
        .add_event_listener_with_callback("active", on_active.as_ref().unchecked_ref())
        .is_err()
    {
        web_sys::console::error_1(&"Failed to listen for active events".into());
    }
    on_active.forget();

    ACTIVE_STREAM.with(|cell| {
        if let Some(previous) = cell.borrow_mut().replace(source) {
            previous.close();
        }
    });
}

fn close_active_event_stream() {
    ACTIVE_STREAM.with(|cell| {
        if let Some(source) = cell.borrow_mut().take() {
            source.close();
        }
    });
}

#[component]
pub fn App() -> impl IntoView {
    let (screen, set_screen) = signal(Screen::Signup);
    let (player, set_player) = signal(None::<PlayerIdentity>);
    let (active_event, set_active_event) = signal(None::<EventInfo>);
    let (round, set_round) = signal(0u32);

    subscribe_active_event(set_active_event);
    on_cleanup(close_active_event_stream);

    let event_name = move || {
        active_event
            .get()
            .map(|event| event.name)
            .unwrap_or_else(|| "…".to_string())
    };

    view! {
        <div class="min-h-screen bg-gray-100 p-8">
            <div class="max-w-4xl mx-auto">
                <h1 class="text-4xl font-bold text-center mb-2 text-blue-600">"⌨️ Typing Race"</h1>
                <div class="text-center text-sm text-gray-600 mb-6">
                    "Event: " <span class="font-semibold">{event_name}</span>
                </div>

                <div class="flex justify-center gap-4 mb-6">
                    <button
                        class="bg-blue-500 text-white px-4 py-2 rounded hover:bg-blue-600"
                        on:click=move |_| {
                            if player.get_untracked().is_some() {
                                set_round.update(|n| *n += 1);
                                set_screen.set(Screen::Race);
                            } else {
                                set_screen.set(Screen::Signup);
                            }
                        }
                    >
                        "New race"
                    </button>
                    <button
                        class="bg-gray-500 text-white px-4 py-2 rounded hover:bg-gray-600"
                        on:click=move |_| set_screen.set(Screen::Highscores)
                    >
                        "Leaderboard"
                    </button>
                </div>

                {move || match (screen.get(), player.get()) {
                    (Screen::Race, Some(identity)) => {
                        let _ = round.get();
                        view! { <RaceScreen player=identity set_screen=set_screen set_round=set_round/> }
                            .into_any()
                    }
                    (Screen::Highscores, _) => {
                        view! { <HighscoreTable event=active_event/> }.into_any()
                    }
                    _ => view! { <SignupForm set_player=set_player set_screen=set_screen/> }.into_any(),
                }}
            </div>
        </div>
    }
}

#[component]
fn SignupForm(
    set_player: WriteSignal<Option<PlayerIdentity>>,
    set_screen: WriteSignal<Screen>,
) -> impl IntoView {
    let (name, set_name) = signal(String::new());
    let (email, set_email) = signal(String::new());
    let (error, set_error) = signal(None::<String>);
    let (name_hint, set_name_hint) = signal(None::<String>);
    let (busy, set_busy) = signal(false);

    let check_name = move |_| {
        let wanted = name.get_untracked();
        if wanted.trim().is_empty() {
            set_name_hint.set(None);
            return;
        }
        spawn_local(async move {
            let Ok(api) = ApiClient::from_location() else {
                return;
            };
            match api.check_name(wanted.trim()).await {
                Ok(availability) if !availability.available => {
                    set_name_hint.set(Some("That name is already on the board".to_string()))
                }
                Ok(_) => set_name_hint.set(None),
                Err(err) => web_sys::console::warn_1(&err.to_string().into()),
            }
        });
    };

    let on_submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        let registration = PlayerRegistration {
            name: name.get_untracked().trim().to_string(),
            email: email.get_untracked().trim().to_string(),
        };
        if let Err(err) = registration.validate() {
            set_error.set(Some(err.to_string()));
            return;
        }
        set_busy.set(true);
        set_error.set(None);
        spawn_local(async move {
            let result = match ApiClient::from_location() {
                Ok(api) => api.register_player(&registration).await,
                Err(err) => Err(err),
            };
            set_busy.set(false);
            match result {
                Ok(registered) => {
                    set_player.set(Some(PlayerIdentity {
                        name: registered.name,
                        email: registered.email,
                    }));
                    set_screen.set(Screen::Race);
                }
                Err(err) if err.is_conflict() => set_error.set(Some(
                    "This email is already registered for the event".to_string(),
                )),
                Err(err) => set_error.set(Some(format!("Could not register: {err}"))),
            }
        });
    };

    view! {
        <form class="bg-white rounded-lg shadow-lg p-6 mb-6" on:submit=on_submit>
            <h2 class="text-xl font-semibold mb-4">"Sign up to race"</h2>
            <div class="flex gap-4 mb-4">
                <input
                    type="text"
                    placeholder="Your name"
                    class="border rounded px-3 py-2 flex-1"
                    prop:value=name
                    on:input=move |ev| set_name.set(event_target_value(&ev))
                    on:blur=check_name
                />
                <input
                    type="email"
                    placeholder="Email"
                    class="border rounded px-3 py-2 flex-1"
                    prop:value=email
                    on:input=move |ev| set_email.set(event_target_value(&ev))
                />
                <button
                    type="submit"
                    class="bg-green-500 text-white px-4 py-2 rounded hover:bg-green-600"
                    disabled=busy
                >
                    "Start racing"
                </button>
            </div>
            <Show when=move || name_hint.get().is_some()>
                <div class="text-sm text-yellow-700 mb-2">{move || name_hint.get().unwrap_or_default()}</div>
            </Show>
            <Show when=move || error.get().is_some()>
                <div class="p-3 bg-red-100 border border-red-400 text-red-700 rounded">
                    {move || error.get().unwrap_or_default()}
                </div>
            </Show>
        </form>
    }
}

fn current_line(view: &RaceView) -> Vec<AnyView> {
    let active = view.active_word;
    view.lines[0]
        .split(' ')
        .enumerate()
        .map(|(i, word)| {
            if i == active {
                let chars: Vec<AnyView> = view
                    .marks
                    .iter()
                    .map(|(c, mark)| {
                        let class = match mark {
                            CharMark::Correct => "text-green-600",
                            CharMark::Pending => "text-gray-900",
                        };
                        view! { <span class=class>{c.to_string()}</span> }.into_any()
                    })
                    .collect();
                view! { <span class="underline font-semibold mr-2">{chars}</span> }.into_any()
            } else {
                let class = if i < active { "text-green-700 mr-2" } else { "text-gray-800 mr-2" };
                view! { <span class=class>{word.to_string()}</span> }.into_any()
            }
        })
        .collect()
}

fn placement_text(view: &RaceView) -> String {
    match (view.settled, view.placement) {
        (false, _) => "Checking the leaderboard…".to_string(),
        (true, Some(place)) if place as i64 > DEFAULT_LIMIT => {
            format!("You placed #{place} (outside top {DEFAULT_LIMIT})")
        }
        (true, Some(place)) => format!("You placed #{place}"),
        (true, None) => "Placement unavailable".to_string(),
    }
}

#[component]
fn RaceScreen(
    player: PlayerIdentity,
    set_screen: WriteSignal<Screen>,
    set_round: WriteSignal<u32>,
) -> impl IntoView {
    let (race, set_race) = signal(RaceView::default());
    let textarea: NodeRef<html::Textarea> = NodeRef::new();

    let own_name = player.name.clone();
    let text = passage_for_seed(js_sys::Date::now() as u64);
    let session_id = session::begin(player, text, set_race);
    on_cleanup(move || session::end(session_id));

    let on_input = move |ev: leptos::ev::Event| {
        let value = event_target_value(&ev);
        // a rejected edit is undone by writing the accepted value back
        if let Some(shown) = session::input(&value) {
            if shown != value {
                if let Some(el) = textarea.get_untracked() {
                    el.set_value(&shown);
                }
            }
        }
    };

    let own_result =
        Signal::derive(move || race.with(|v| v.result.map(|r| (own_name.clone(), r.cps))));

    let finished = move || race.with(|v| matches!(v.state, RaceState::Ended | RaceState::TornDown));

    view! {
        <div class="bg-white rounded-lg shadow-lg p-6 mb-6">
            <div class="flex justify-between items-center mb-4">
                <h2 class="text-xl font-semibold">"Type the text below"</h2>
                <div class="flex gap-4 text-sm">
                    <div class="text-center">
                        <div class="font-bold text-lg text-blue-600">{move || race.with(|v| v.seconds_left)}</div>
                        <div class="text-gray-500">"seconds"</div>
                    </div>
                    <div class="text-center">
                        <div class="font-bold text-lg text-purple-600">
                            {move || race.with(|v| v.indicator.map(|i| i.to_string()).unwrap_or_default())}
                        </div>
                        <div class="text-gray-500">"vs ghost"</div>
                    </div>
                </div>
            </div>

            <div class="mb-4 space-y-2">
                <div class="h-3 bg-gray-200 rounded">
                    <div
                        class="h-3 bg-blue-500 rounded"
                        style:width=move || race.with(|v| format!("{:.1}%", v.progress * 100.0))
                    ></div>
                </div>
                <Show when=move || race.with(|v| v.ghost.is_some())>
                    <div class="h-3 bg-gray-200 rounded">
                        <div
                            class="h-3 bg-purple-400 rounded opacity-70"
                            style:width=move || race.with(|v| format!("{:.1}%", v.ghost.unwrap_or(0.0) * 100.0))
                        ></div>
                    </div>
                </Show>
            </div>

            <div class="text-lg font-mono leading-relaxed p-4 bg-gray-50 rounded border-2 border-gray-200 mb-2">
                <div>{move || race.with(current_line)}</div>
                <div class="text-gray-400">{move || race.with(|v| v.lines[1].clone())}</div>
            </div>

            <textarea
                class="w-full border rounded px-3 py-2 font-mono"
                rows="2"
                autofocus=true
                spellcheck="false"
                node_ref=textarea
                disabled=finished
                on:input=on_input
                on:keydown=move |ev: leptos::ev::KeyboardEvent| {
                    if ev.key() == "Enter" {
                        ev.prevent_default();
                    }
                }
                on:paste=move |ev: leptos::ev::Event| ev.prevent_default()
                on:drop=move |ev: leptos::ev::DragEvent| ev.prevent_default()
            ></textarea>

            <Show when=move || race.with(|v| v.result.is_some())>
                <div class="mt-6">
                    <h3 class="text-lg font-semibold mb-2">"Race finished!"</h3>
                    <div class="flex gap-6 mb-2">
                        <span>
                            {move || race.with(|v| v.result.map(|r| format!("{:.2} CPS", r.cps)).unwrap_or_default())}
                        </span>
                        <span>
                            {move || race.with(|v| v.result.map(|r| format!("{} chars in {:.1}s", r.chars_typed, r.elapsed_secs())).unwrap_or_default())}
                        </span>
                    </div>
                    <div class="font-semibold mb-4">{move || race.with(placement_text)}</div>
                    <ScoreRows
                        scores=Signal::derive(move || race.with(|v| v.leaderboard.clone()))
                        highlight=own_result
                    />
                    <div class="flex gap-4 mt-4">
                        <button
                            class="bg-green-500 text-white px-4 py-2 rounded hover:bg-green-600"
                            on:click=move |_| set_round.update(|n| *n += 1)
                        >
                            "Race again"
                        </button>
                        <button
                            class="bg-gray-500 text-white px-4 py-2 rounded hover:bg-gray-600"
                            on:click=move |_| set_screen.set(Screen::Highscores)
                        >
                            "Leaderboard"
                        </button>
                    </div>
                </div>
            </Show>
        </div>
    }
}

fn duration_text(duration_ms: u64) -> String {
    format!("{:.2} s", duration_ms as f64 / 1000.0)
}

/// Leaderboard rows; the row matching `highlight` (name and CPS) is marked.
#[component]
fn ScoreRows(
    #[prop(into)] scores: Signal<Vec<ScoreEntry>>,
    #[prop(into)] highlight: Signal<Option<(String, f64)>>,
) -> impl IntoView {
    view! {
        <table class="w-full text-sm">
            <thead>
                <tr class="text-left text-gray-500">
                    <th>"#"</th>
                    <th>"Name"</th>
                    <th>"CPS"</th>
                    <th>"Time"</th>
                    <th>"Chars"</th>
                    <th>"When"</th>
                </tr>
            </thead>
            <tbody>
                <For
                    each=move || scores.get().into_iter().enumerate()
                    key=|(_, entry)| entry.id.clone()
                    children=move |(i, entry)| {
                        let own = {
                            let entry = entry.clone();
                            move || highlight.with(|h| {
                                h.as_ref().is_some_and(|(name, cps)| is_own_result(&entry, name, *cps))
                            })
                        };
                        view! {
                            <tr class=move || if own() { "border-t bg-yellow-100 font-semibold" } else { "border-t" }>
                                <td>{i + 1}</td>
                                <td>{entry.name}</td>
                                <td>{format!("{:.2}", entry.cps)}</td>
                                <td>{duration_text(entry.duration_ms)}</td>
                                <td>{entry.chars_typed}</td>
                                <td>{entry.timestamp.format("%Y-%m-%d %H:%M").to_string()}</td>
                            </tr>
                        }
                    }
                />
            </tbody>
        </table>
    }
}

/// Start a fetch generation, retiring the previous one.
fn next_run(previous: Option<Liveness>) -> Liveness {
    if let Some(previous) = previous {
        previous.revoke();
    }
    Liveness::new()
}

#[component]
fn HighscoreTable(event: ReadSignal<Option<EventInfo>>) -> impl IntoView {
    let (scores, set_scores) = signal(Vec::<ScoreEntry>::new());
    let (status, set_status) = signal(Some("Loading…".to_string()));

    let mounted = Liveness::new();
    on_cleanup({
        let mounted = mounted.clone();
        move || mounted.revoke()
    });

    // reload whenever the active event changes; an older run's response is
    // dropped
    Effect::new(move |previous: Option<Liveness>| {
        let run = next_run(previous);
        let _ = event.get();
        let (current, mounted) = (run.clone(), mounted.clone());
        spawn_local(async move {
            let query = HighscoreQuery {
                limit: DEFAULT_LIMIT,
                unique_email: true,
            };
            let result = match ApiClient::from_location() {
                Ok(api) => api.highscores(&query).await,
                Err(err) => Err(err),
            };
            if !current.is_alive() || !mounted.is_alive() {
                return;
            }
            match result {
                Ok(list) => {
                    set_status.set(if list.is_empty() { Some("No scores yet".to_string()) } else { None });
                    set_scores.set(list);
                }
                Err(err) => set_status.set(Some(format!("Could not load highscores: {err}"))),
            }
        });
        run
    });

    view! {
        <div class="bg-white rounded-lg shadow-lg p-6 mb-6">
            <h2 class="text-xl font-semibold mb-4">"Leaderboard"</h2>
            <Show when=move || status.get().is_some()>
                <div class="text-gray-500 mb-2">{move || status.get().unwrap_or_default()}</div>
            </Show>
            <ScoreRows scores=scores highlight=Signal::derive(|| None::<(String, f64)>)/>
        </div>
    }
}
