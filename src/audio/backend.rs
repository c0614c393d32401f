use crate::api::models::TrackSource;

/// Seam between the session manager and the decode/output machinery.
///
/// `load` must tear down whatever the backend was doing before it touches
/// the new source, so callbacks from a replaced item can never fire again.
/// Loading is asynchronous: the manager polls `is_loaded` /
/// `take_load_error` to observe the outcome.
pub trait AudioBackend: Send {
    fn load(&mut self, source: &TrackSource, duration_hint: f64);

    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);

    /// Position in seconds. The manager clamps before calling.
    fn seek(&mut self, position: f64);

    fn position(&self) -> f64;
    fn duration(&self) -> f64;

    /// True once the loaded item is ready to produce samples.
    fn is_loaded(&self) -> bool;
    /// True once the current item has played to its end.
    fn is_finished(&self) -> bool;
    /// Consumes the load failure, if the last `load` failed.
    fn take_load_error(&mut self) -> Option<String>;

    fn set_volume(&mut self, volume: f32);
    fn volume(&self) -> f32;
}
