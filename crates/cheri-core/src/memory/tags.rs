//! Sparse byte memory with one validity tag per 16-byte granule.

use std::collections::BTreeMap;
use std::sync::Arc;

use spin::{Mutex, RwLock};
use tracing::trace;

use crate::compression::{compress, decompress, CAPABILITY_SIZE_BYTES};
use crate::CapabilityRegister;

/// Bytes covered by one tag bit.
pub const GRANULE_BYTES: u64 = CAPABILITY_SIZE_BYTES as u64;
/// `log2(GRANULE_BYTES)`.
pub const GRANULE_SHIFT: u32 = 4;

const PAGE_GRANULE_SHIFT: u32 = 8;
const PAGE_GRANULES: usize = 1 << PAGE_GRANULE_SHIFT;

/// Granule index holding `addr`.
#[must_use]
pub const fn granule_index(addr: u64) -> u64 {
    addr >> GRANULE_SHIFT
}

/// First and last granule overlapped by `[addr, addr + len)`, or `None` for
/// an empty span. Spans running past `2^64` stop at the last granule.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn granule_span(addr: u64, len: u64) -> Option<(u64, u64)> {
    if len == 0 {
        return None;
    }
    let end = addr as u128 + len as u128 - 1;
    let end = if end > u64::MAX as u128 {
        u64::MAX
    } else {
        end as u64
    };
    Some((granule_index(addr), granule_index(end)))
}

/// Byte memory and tag store consumed by capability loads and stores.
///
/// Implementations must make each granule's data and tag change together:
/// a concurrent data write and capability store to the same granule may
/// never leave the tag set over stale bytes.
pub trait CapabilityMemory {
    /// Reads `buf.len()` bytes starting at `addr`. Bytes past the end of the
    /// address space read as zero; the span never wraps to address 0.
    fn read_bytes(&self, addr: u64, buf: &mut [u8]);

    /// Writes `data` at `addr`, clearing the tag of every overlapped granule
    /// under the same per-granule update. Bytes past the end of the address
    /// space are dropped; the span never wraps to address 0.
    fn write_bytes(&self, addr: u64, data: &[u8]);

    /// Reads one granule's bytes and tag as a single snapshot.
    fn read_granule(&self, granule: u64) -> ([u8; CAPABILITY_SIZE_BYTES], bool);

    /// Replaces one granule's bytes and tag in a single update.
    fn write_granule(&self, granule: u64, image: &[u8; CAPABILITY_SIZE_BYTES], tag: bool);

    /// Tag of `granule`.
    fn tag(&self, granule: u64) -> bool;

    /// Sets or clears the tag of `granule` without touching its bytes.
    fn set_tag(&self, granule: u64, valid: bool);

    /// Tag of the granule holding `addr`.
    fn load_tag(&self, addr: u64) -> bool {
        self.tag(granule_index(addr))
    }

    /// Clears the tag of every granule overlapping `[addr, addr + len)`,
    /// including partially overlapped ones.
    ///
    /// `len` may cover most of the address space, so implementations should
    /// visit only the granules they actually hold.
    fn invalidate_tags(&self, addr: u64, len: u64);

    /// Stores the memory image and tag of `cap` into the granule holding `addr`.
    fn store_capability(&self, addr: u64, cap: &CapabilityRegister) {
        self.write_granule(granule_index(addr), &compress(cap), cap.tag());
    }

    /// Loads the capability in the granule holding `addr`, with its tag.
    fn load_capability(&self, addr: u64) -> CapabilityRegister {
        let (image, tag) = self.read_granule(granule_index(addr));
        decompress(&image, tag)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Granule {
    bytes: [u8; CAPABILITY_SIZE_BYTES],
    tag: bool,
}

#[derive(Debug)]
struct Page {
    granules: [Mutex<Granule>; PAGE_GRANULES],
}

impl Page {
    fn new() -> Self {
        Self {
            granules: core::array::from_fn(|_| Mutex::new(Granule::default())),
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn page_slot(granule: u64) -> (u64, usize) {
    (
        granule >> PAGE_GRANULE_SHIFT,
        (granule & (PAGE_GRANULES as u64 - 1)) as usize,
    )
}

/// Sparse, thread-safe tagged memory.
///
/// Pages are allocated on first write. Unmapped bytes read as zero with a
/// clear tag. Each granule sits behind its own lock, so independent CPUs
/// can share one instance.
#[derive(Debug, Default)]
pub struct TaggedMemory {
    pages: RwLock<BTreeMap<u64, Arc<Page>>>,
}

impl TaggedMemory {
    /// Creates an empty memory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pages that have been written to.
    #[must_use]
    pub fn mapped_pages(&self) -> usize {
        self.pages.read().len()
    }

    fn existing_granule<R>(&self, granule: u64, f: impl FnOnce(&mut Granule) -> R) -> Option<R> {
        let (page, slot) = page_slot(granule);
        let page = self.pages.read().get(&page).map(Arc::clone)?;
        let mut guard = page.granules[slot].lock();
        Some(f(&mut *guard))
    }

    fn granule_or_insert<R>(&self, granule: u64, f: impl FnOnce(&mut Granule) -> R) -> R {
        let (page_number, slot) = page_slot(granule);
        let existing = self.pages.read().get(&page_number).map(Arc::clone);
        let page = existing.unwrap_or_else(|| {
            Arc::clone(
                self.pages
                    .write()
                    .entry(page_number)
                    .or_insert_with(|| Arc::new(Page::new())),
            )
        });
        let mut guard = page.granules[slot].lock();
        f(&mut *guard)
    }
}

/// Number of the `len` bytes at `addr` that lie below `2^64`.
fn in_address_space(addr: u64, len: usize) -> usize {
    let room = u128::from(u64::MAX - addr) + 1;
    usize::try_from(room).map_or(len, |room| len.min(room))
}

#[allow(clippy::cast_possible_truncation)]
const fn chunk(addr: u64, remaining: usize) -> (u64, usize, usize) {
    let start = (addr & (GRANULE_BYTES - 1)) as usize;
    let room = CAPABILITY_SIZE_BYTES - start;
    let take = if remaining < room { remaining } else { room };
    (granule_index(addr), start, take)
}

impl CapabilityMemory for TaggedMemory {
    fn read_bytes(&self, addr: u64, buf: &mut [u8]) {
        let (buf, beyond) = buf.split_at_mut(in_address_space(addr, buf.len()));
        beyond.fill(0);
        let mut offset = 0;
        while offset < buf.len() {
            let (granule, start, take) = chunk(addr + offset as u64, buf.len() - offset);
            let dst = &mut buf[offset..offset + take];
            let mapped = self
                .existing_granule(granule, |cell| {
                    dst.copy_from_slice(&cell.bytes[start..start + take]);
                })
                .is_some();
            if !mapped {
                dst.fill(0);
            }
            offset += take;
        }
    }

    fn write_bytes(&self, addr: u64, data: &[u8]) {
        let data = &data[..in_address_space(addr, data.len())];
        let mut offset = 0;
        while offset < data.len() {
            let (granule, start, take) = chunk(addr + offset as u64, data.len() - offset);
            let src = &data[offset..offset + take];
            let was_tagged = self.granule_or_insert(granule, |cell| {
                cell.bytes[start..start + take].copy_from_slice(src);
                core::mem::replace(&mut cell.tag, false)
            });
            if was_tagged {
                trace!(granule, "data write cleared capability tag");
            }
            offset += take;
        }
    }

    fn read_granule(&self, granule: u64) -> ([u8; CAPABILITY_SIZE_BYTES], bool) {
        self.existing_granule(granule, |cell| (cell.bytes, cell.tag))
            .unwrap_or(([0; CAPABILITY_SIZE_BYTES], false))
    }

    fn write_granule(&self, granule: u64, image: &[u8; CAPABILITY_SIZE_BYTES], tag: bool) {
        self.granule_or_insert(granule, |cell| {
            cell.bytes = *image;
            cell.tag = tag;
        });
    }

    fn tag(&self, granule: u64) -> bool {
        self.existing_granule(granule, |cell| cell.tag)
            .unwrap_or_default()
    }

    fn set_tag(&self, granule: u64, valid: bool) {
        if valid {
            self.granule_or_insert(granule, |cell| cell.tag = true);
        } else {
            self.existing_granule(granule, |cell| cell.tag = false);
        }
    }

    fn invalidate_tags(&self, addr: u64, len: u64) {
        let Some((first, last)) = granule_span(addr, len) else {
            return;
        };
        let pages: Vec<(u64, Arc<Page>)> = self
            .pages
            .read()
            .range(first >> PAGE_GRANULE_SHIFT..=last >> PAGE_GRANULE_SHIFT)
            .map(|(number, page)| (*number, Arc::clone(page)))
            .collect();
        for (number, page) in pages {
            for (slot, cell) in (0_u64..).zip(page.granules.iter()) {
                let granule = (number << PAGE_GRANULE_SHIFT) | slot;
                if granule < first || granule > last {
                    continue;
                }
                let mut cell = cell.lock();
                if cell.tag {
                    trace!(granule, "tag invalidated");
                    cell.tag = false;
                }
            }
        }
    }
}
