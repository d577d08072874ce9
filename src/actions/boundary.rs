// Failure boundary around action bodies.
//
// A panic inside an action must become an ERROR result, never unwind into the
// run loop. The process-wide panic hook records where the panic happened and a
// backtrace while the stack is still intact; `contain` picks that record up
// after `catch_unwind` returns. Panics outside a boundary go to the previous
// hook unchanged.
use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

thread_local! {
    static INSIDE: Cell<bool> = const { Cell::new(false) };
    static LAST_PANIC: RefCell<Option<String>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

fn install_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if INSIDE.with(Cell::get) {
                let location = info
                    .location()
                    .map(|l| format!("{}:{}", l.file(), l.line()))
                    .unwrap_or_else(|| "<unknown>".to_string());
                let trace = format!("panicked at {location}\n{}", Backtrace::force_capture());
                LAST_PANIC.with(|slot| *slot.borrow_mut() = Some(trace));
            } else {
                previous(info);
            }
        }));
    });
}

/// A panic caught at the boundary.
#[derive(Debug)]
pub struct Caught {
    pub message: String,
    pub trace: String,
}

fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}

/// Run `body`, converting a panic into `Err(Caught)`.
pub fn contain<T>(body: impl FnOnce() -> T) -> Result<T, Caught> {
    install_hook();
    let outer = INSIDE.with(|c| c.replace(true));
    let out = panic::catch_unwind(AssertUnwindSafe(body));
    INSIDE.with(|c| c.set(outer));
    out.map_err(|payload| {
        let trace = LAST_PANIC
            .with(|slot| slot.borrow_mut().take())
            .unwrap_or_default();
        Caught {
            message: payload_message(payload.as_ref()),
            trace,
        }
    })
}
