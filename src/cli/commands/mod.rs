use serde::Serialize;

pub(super) mod batch;
pub(super) mod inspect;
pub(super) mod preview;
pub(super) mod run;

/// Pretty-printed JSON on stdout. Serialization of report types cannot
/// realistically fail; a failure is logged rather than masking the run's
/// own outcome.
pub(super) fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(rendered) => println!("{rendered}"),
        Err(err) => tracing::error!(error = %err, "failed to serialize output"),
    }
}
