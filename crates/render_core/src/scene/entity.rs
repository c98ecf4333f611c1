//! Entity implementation

use slotmap::new_key_type;

new_key_type! {
    /// Entity identifier
    ///
    /// Generational key into the scene's storage, so a handle to a destroyed
    /// entity never aliases a newer one.
    pub struct Entity;
}
