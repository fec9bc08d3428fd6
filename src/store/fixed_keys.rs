pub trait FixedKeys {
    const APP_STATE_KEY: &'static [u8] = b"app-state";
}
