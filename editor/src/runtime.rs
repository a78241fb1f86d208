//! Async driver for an `EditorSession`.
//!
//! Races three sources on a single thread: the engine's initialization
//! future, the session's earliest deadline, and the event channel. The
//! session itself stays sans-IO; this is the only place that reads the clock.
//!
//! Queued events win over a due timer. A next-turn save armed by a trigger
//! therefore runs only after the edits queued behind that trigger were
//! applied.
//!
//! Closing the channel counts as an unload: pending work is flushed and the
//! session is torn down before `run` returns it.

use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use smol::channel::Receiver;
use smol::future::{or, pending};
use smol::Timer;

use notegrid_engine::{Engine, EngineError};

use crate::bridge::HostApi;
use crate::session::{EditorEvent, EditorSession};
use crate::triggers::{LifecycleEvent, Trigger};

type InitFuture = Pin<Box<dyn Future<Output = Result<(), EngineError>>>>;

enum Step<M> {
    Init(Result<(), EngineError>),
    Timer,
    Event(EditorEvent<M>),
    Closed,
}

/// Drive `session` until it is torn down, then hand it back.
pub async fn run<E, H>(
    mut session: EditorSession<E, H>,
    events: Receiver<EditorEvent<E::Model>>,
) -> EditorSession<E, H>
where
    E: Engine + 'static,
    H: HostApi,
{
    let mut init = session.begin_init().map(|fut| Box::pin(fut) as InitFuture);

    while !session.is_torn_down() {
        let deadline = session.next_deadline();

        let step = {
            let init_step = async {
                match init.as_mut() {
                    Some(fut) => Step::Init(fut.await),
                    None => pending().await,
                }
            };
            let timer_step = async {
                match deadline {
                    Some(at) => {
                        Timer::at(at).await;
                        Step::Timer
                    }
                    None => pending().await,
                }
            };
            let event_step = async {
                match events.recv().await {
                    Ok(event) => Step::Event(event),
                    Err(_) => Step::Closed,
                }
            };
            or(init_step, or(event_step, timer_step)).await
        };

        let now = Instant::now();
        match step {
            Step::Init(result) => {
                init = None;
                session.dispatch(EditorEvent::EngineInit(result), now);
            }
            Step::Timer => {
                session.tick(now);
            }
            Step::Event(event) => {
                session.dispatch(event, now);
            }
            Step::Closed => {
                log::debug!("Event channel closed, unloading");
                session.dispatch(EditorEvent::Trigger(Trigger::Lifecycle(LifecycleEvent::Unload)), now);
                break;
            }
        }
    }

    session
}
