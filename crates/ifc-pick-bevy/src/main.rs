//! IFC-Pick viewer binary
//!
//! Press `O` to open a `.ifcb` bundle or drop one onto the window.

fn main() {
    ifc_pick_bevy::run_native();
}
