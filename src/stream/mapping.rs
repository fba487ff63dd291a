use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Cpu,
    Gpu,
}

/// Parse a user-supplied worker-slot mapping string.
///
/// The string lists, comma-separated, the slot indices that run GPU
/// workers. Empty input selects the default layout (CPU slots first, GPU
/// slots after).
pub fn parse_gpu_mapping(
    s: &str,
    total_workers: usize,
    gpu_workers: usize,
) -> Result<BTreeSet<usize>, String> {
    if total_workers == 0 || gpu_workers > total_workers {
        return Err(format!(
            "invalid number of streaming workers (total={total_workers}, gpu={gpu_workers})"
        ));
    }

    let mut mapping = BTreeSet::new();
    if s.is_empty() {
        return Ok(mapping);
    }

    for tok in s.split(',') {
        let slot: usize = tok
            .trim()
            .parse()
            .map_err(|_| format!("invalid slot index {tok:?} in GPU mapping"))?;
        if slot >= total_workers {
            return Err(format!(
                "slot index {slot} out of range (total workers {total_workers})"
            ));
        }
        mapping.insert(slot);
    }

    if mapping.len() != gpu_workers {
        return Err(format!(
            "GPU mapping names {} slots, expected {gpu_workers}",
            mapping.len()
        ));
    }

    Ok(mapping)
}

/// Expand worker counts plus an optional explicit mapping into the
/// slot->kind table. An empty mapping puts CPU workers in the low slots.
pub fn layout_slots(
    num_cpu_workers: usize,
    num_gpu_workers: usize,
    gpu_mapping: &BTreeSet<usize>,
) -> Vec<SlotKind> {
    let total = num_cpu_workers + num_gpu_workers;
    if gpu_mapping.is_empty() {
        let mut kinds = vec![SlotKind::Cpu; num_cpu_workers];
        kinds.extend(std::iter::repeat(SlotKind::Gpu).take(num_gpu_workers));
        kinds
    } else {
        (0..total)
            .map(|slot| {
                if gpu_mapping.contains(&slot) {
                    SlotKind::Gpu
                } else {
                    SlotKind::Cpu
                }
            })
            .collect()
    }
}
