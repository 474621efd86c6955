use std::cell::RefCell;

use log::warn;

#[derive(Clone, Copy)]
struct Env {
    seed: Option<u64>,
}

thread_local! {
    /// Must only be mutated within `set_env`
    static ENV: RefCell<Option<Env>> = const { RefCell::new(None) };
}

pub fn init() {
    let value = Env {
        seed: var_parsed("NYBBLE_SEED"),
    };
    set_env(value);
}

/// Seed for `rnv` given through `NYBBLE_SEED`, if any.
pub fn seed() -> Option<u64> {
    with_env(|env| env.seed)
}

fn set_env(value: Env) {
    ENV.with(|env| {
        let mut env = env.borrow_mut();
        assert!(
            env.is_none(),
            "tried to initialize environment state multiple times"
        );
        *env = Some(value);
    });
}

fn with_env<F, R>(callback: F) -> R
where
    F: Fn(&Env) -> R,
{
    ENV.with(|env| {
        let env = env.borrow();
        let env = env.unwrap_or_else(|| {
            panic!("tried to access environment state before initialization");
        });
        callback(&env)
    })
}

fn var_parsed(name: &str) -> Option<u64> {
    let value = std::env::var(name).ok()?;
    match value.trim().parse() {
        Ok(seed) => Some(seed),
        Err(e) => {
            warn!("ignoring {name}={value:?}: {e}");
            None
        }
    }
}
