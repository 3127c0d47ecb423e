use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;

use clap::Parser;
use fib_hash::HashTable;
use fib_hash::hash_table::Entry;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    /// Hash values by identity instead of through `DefaultHasher`.
    #[arg(short = 'i', long = "identity")]
    identity: bool,

    /// Remove every n-th value after filling, to show backward shifting.
    #[arg(short = 'r', long = "remove_every")]
    remove_every: Option<u64>,
}

fn hash_u64(value: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn main() {
    let args = Args::parse();
    let hash: fn(&u64) -> u64 = if args.identity {
        |v| *v
    } else {
        |v| hash_u64(*v)
    };

    println!(
        "Creating HashTable with target capacity: {}",
        args.target_capacity
    );

    let mut table: HashTable<u64> = HashTable::with_capacity(args.target_capacity);
    let initial_capacity = table.capacity();

    println!("Actual capacity: {}", initial_capacity);
    println!("Filling table with u64 values up to the load limit...");

    let num_values = (initial_capacity * 3 / 4) as u64;
    for value in 0..num_values {
        match table.entry(hash(&value), |&v| v == value, hash) {
            Entry::Vacant(entry) => {
                entry.insert(value);
            }
            Entry::Occupied(_) => {
                panic!("Value already exists in table: {}", value);
            }
        }
    }

    println!("Inserted {} values into table", table.len());
    println!("Final load factor: {:.2}%", table.load_factor() * 100.0);
    if table.capacity() != initial_capacity {
        println!(
            "Table grew from {} to {} slots",
            initial_capacity,
            table.capacity()
        );
    }

    table.probe_histogram(hash).print();
    table.debug_stats().print();

    if let Some(n) = args.remove_every.filter(|&n| n > 0) {
        let before = table.len();
        table.retain(|&mut v| v % n != 0, hash);
        println!();
        println!(
            "Removed {} values (every {}th), {} remain",
            before - table.len(),
            n,
            table.len()
        );

        table.probe_histogram(hash).print();
        table.debug_stats().print();
    }
}
