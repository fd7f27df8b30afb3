//! Basic handle usage example

use custody::{OwnerBased, Shared, Unique, Weak};
use std::ptr::NonNull;

struct Texture {
    name: String,
    pixels: Vec<u8>,
}

fn main() {
    println!("custody Basic Usage Example");
    println!("===========================");

    // Exclusive ownership with a logging deleter
    let unique = unsafe {
        Unique::from_raw_with(
            Box::into_raw(Box::new(Texture {
                name: String::from("grass"),
                pixels: vec![0; 16],
            })),
            |ptr: NonNull<Texture>| {
                let texture = Box::from_raw(ptr.as_ptr());
                println!("  released texture '{}'", texture.name);
            },
        )
    };
    println!("Unique: '{}' ({} bytes)", unique.name, unique.pixels.len());

    // Hand it over to shared ownership; the deleter moves into the control block
    let shared = Shared::from(unique);
    let cache_entry = shared.clone();
    println!("Shared: use_count = {}", shared.use_count());

    // A cache keeps only weak references
    let cache: Vec<Weak<Texture>> = vec![cache_entry.downgrade()];
    drop(cache_entry);

    // Hand out a view of one field that keeps the whole texture alive
    let name = shared.project(|texture| texture.name.as_str());
    println!("Projected name: '{}' (same owner: {})", &*name, name.owner_eq(&shared));

    drop(shared);
    println!("After dropping the original: expired = {}", cache[0].expired());

    drop(name);
    println!("After dropping the projection: expired = {}", cache[0].expired());
    println!("Lock on expired entry is empty: {}", cache[0].lock().is_empty());
}
