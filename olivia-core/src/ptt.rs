//! Push-to-talk bridge trait, standing in for a radio-control process
//! (hamlib/rigctl) the controller keys around transmissions.

/// Keys a radio transmitter on/off. Implementations normally talk to
/// an external rig-control process or GPIO line.
pub trait PttControl: Send {
    fn key_on(&mut self);
    fn key_off(&mut self);
}

/// Default no-op implementation, used when no radio bridge is wired in.
pub struct NoopPtt;

impl PttControl for NoopPtt {
    fn key_on(&mut self) {}
    fn key_off(&mut self) {}
}
