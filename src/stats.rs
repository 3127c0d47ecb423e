//! Occupancy and probe-length statistics.
//!
//! Compiled only with the `stats` feature. Printing requires `std`.

use alloc::vec::Vec;

/// Debug statistics for hash table analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugStats {
    /// Number of elements currently in the table
    pub populated: usize,
    /// Total number of slots allocated
    pub capacity: usize,
    /// Number of elements the table holds before its next growth
    pub max_populated: usize,
    /// Load factor (populated / capacity)
    pub load_factor: f32,
    /// Total memory in bytes used by the slot array
    pub total_bytes: usize,
    /// Bytes held by empty slots
    pub wasted_bytes: usize,
}

impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% load factor)",
            self.populated,
            self.capacity,
            self.load_factor * 100.0
        );
        println!("Growth at: {} elements", self.max_populated + 1);
        println!("Total Allocated: {} bytes", self.total_bytes);
        println!(
            "Memory: {} bytes wasted ({:.02}%)",
            self.wasted_bytes,
            if self.total_bytes == 0 {
                0.0
            } else {
                (self.wasted_bytes as f64 / self.total_bytes as f64) * 100.0
            }
        );
    }
}

/// Counts of entries by displacement from their ideal slot.
///
/// `counts()[d]` is the number of entries sitting `d` slots past the slot
/// their hash maps to. A lookup for such an entry inspects `d + 1` slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeHistogram {
    counts: Vec<usize>,
}

impl ProbeHistogram {
    pub(crate) fn record(&mut self, displacement: usize) {
        if self.counts.len() <= displacement {
            self.counts.resize(displacement + 1, 0);
        }
        self.counts[displacement] += 1;
    }

    /// The per-displacement counts. Empty for an empty table.
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Number of entries recorded.
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// The largest displacement of any entry, or `None` for an empty table.
    pub fn max_displacement(&self) -> Option<usize> {
        self.counts.len().checked_sub(1)
    }

    /// Mean number of slots inspected by a successful lookup.
    pub fn mean_probe_length(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }

        let inspected: usize = self
            .counts
            .iter()
            .enumerate()
            .map(|(displacement, &count)| (displacement + 1) * count)
            .sum();
        inspected as f64 / total as f64
    }

    /// Pretty-prints the histogram horizontally using stdout.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        let max = self.counts.iter().copied().max().unwrap_or(0);
        if max == 0 {
            println!("probe histogram: empty");
            return;
        }

        let max_bar = 60usize;
        let total_units = max_bar * 8;
        println!(
            "probe histogram ({} entries, mean probe length {:.3}):",
            self.total(),
            self.mean_probe_length()
        );

        let make_bar = |count: usize| -> std::string::String {
            if count == 0 {
                return std::string::String::new();
            }
            let units = ((count as u128 * total_units as u128).div_ceil(max as u128)) as usize;
            let mut bar = "█".repeat(units / 8);
            let partial = match units % 8 {
                1 => Some('▏'),
                2 => Some('▎'),
                3 => Some('▍'),
                4 => Some('▌'),
                5 => Some('▋'),
                6 => Some('▊'),
                7 => Some('▉'),
                _ => None,
            };
            bar.extend(partial);
            bar
        };

        let width = self.counts.len().to_string().len();
        for (displacement, &count) in self.counts.iter().enumerate() {
            println!(
                "{:>width$} | {} ({})",
                displacement,
                make_bar(count),
                count
            );
        }
    }
}
