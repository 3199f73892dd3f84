use patchbay_midi_io::{list_input_devices, list_output_devices};

fn main() {
    println!("=== MIDI Input Devices ===");
    let inputs = list_input_devices().unwrap();
    if inputs.is_empty() {
        println!("  (none found)");
    }
    for dev in &inputs {
        println!("  [{}] {}", dev.id, dev.name);
    }

    println!("\n=== MIDI Output Devices ===");
    let outputs = list_output_devices().unwrap();
    if outputs.is_empty() {
        println!("  (none found)");
    }
    for dev in &outputs {
        println!("  [{}] {}", dev.id, dev.name);
    }
}
