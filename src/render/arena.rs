use crate::foundation::error::{TexflowError, TexflowResult};
use crate::texture::storage::{Texture, TextureDesc};

/// Stable reference to a texture in a [`TextureArena`].
///
/// The generation makes handles to released slots detectable instead of silently aliasing a newer
/// texture that reused the slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle {
    slot: u32,
    generation: u32,
}

impl TextureHandle {
    /// Slot index inside the arena.
    pub fn slot(self) -> u32 {
        self.slot
    }

    /// Generation of the slot when the handle was issued.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl std::fmt::Display for TextureHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tex#{}v{}", self.slot, self.generation)
    }
}

#[derive(Debug)]
enum Slot {
    Live(Texture),
    /// Temporarily moved out by a dispatch that writes it.
    Lent,
    Free,
}

#[derive(Debug)]
struct Entry {
    generation: u32,
    slot: Slot,
}

/// Owner of every texture the runtime allocates.
#[derive(Debug, Default)]
pub struct TextureArena {
    entries: Vec<Entry>,
    free: Vec<u32>,
    live: usize,
}

impl TextureArena {
    /// Allocate a zeroed texture and return its handle.
    pub fn allocate(&mut self, desc: TextureDesc) -> TextureHandle {
        let texture = Texture::new(desc);
        self.live += 1;
        if let Some(slot) = self.free.pop() {
            let entry = &mut self.entries[slot as usize];
            entry.generation = entry.generation.wrapping_add(1);
            entry.slot = Slot::Live(texture);
            return TextureHandle {
                slot,
                generation: entry.generation,
            };
        }
        let slot = self.entries.len() as u32;
        self.entries.push(Entry {
            generation: 0,
            slot: Slot::Live(texture),
        });
        TextureHandle {
            slot,
            generation: 0,
        }
    }

    /// Release a texture. Stale handles are ignored.
    pub fn release(&mut self, handle: TextureHandle) -> bool {
        let Some(entry) = self.entries.get_mut(handle.slot as usize) else {
            return false;
        };
        if entry.generation != handle.generation || matches!(entry.slot, Slot::Free) {
            return false;
        }
        entry.slot = Slot::Free;
        self.free.push(handle.slot);
        self.live -= 1;
        true
    }

    /// Number of live textures (lent textures included).
    pub fn len(&self) -> usize {
        self.live
    }

    /// Return `true` when no texture is live.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    fn entry(&self, handle: TextureHandle) -> Option<&Entry> {
        self.entries
            .get(handle.slot as usize)
            .filter(|e| e.generation == handle.generation)
    }

    fn entry_mut(&mut self, handle: TextureHandle) -> Option<&mut Entry> {
        self.entries
            .get_mut(handle.slot as usize)
            .filter(|e| e.generation == handle.generation)
    }

    /// Borrow a live texture.
    pub fn get(&self, handle: TextureHandle) -> Option<&Texture> {
        match &self.entry(handle)?.slot {
            Slot::Live(t) => Some(t),
            Slot::Lent | Slot::Free => None,
        }
    }

    /// Mutably borrow a live texture.
    pub fn get_mut(&mut self, handle: TextureHandle) -> Option<&mut Texture> {
        match &mut self.entry_mut(handle)?.slot {
            Slot::Live(t) => Some(t),
            Slot::Lent | Slot::Free => None,
        }
    }

    /// Borrow a live texture or fail with a not-found error.
    pub fn require(&self, handle: TextureHandle) -> TexflowResult<&Texture> {
        self.get(handle)
            .ok_or_else(|| TexflowError::not_found(format!("texture {handle}")))
    }

    /// Move a texture out for exclusive writing. The slot stays reserved until [`Self::restore`].
    pub(crate) fn lend(&mut self, handle: TextureHandle) -> TexflowResult<Texture> {
        let entry = self
            .entry_mut(handle)
            .ok_or_else(|| TexflowError::not_found(format!("texture {handle}")))?;
        match std::mem::replace(&mut entry.slot, Slot::Lent) {
            Slot::Live(t) => Ok(t),
            other => {
                let lent = matches!(other, Slot::Lent);
                entry.slot = other;
                if lent {
                    Err(TexflowError::hazard(format!(
                        "texture {handle} is already bound for writing"
                    )))
                } else {
                    Err(TexflowError::not_found(format!("texture {handle}")))
                }
            }
        }
    }

    /// Put back a texture taken with [`Self::lend`].
    pub(crate) fn restore(&mut self, handle: TextureHandle, texture: Texture) -> TexflowResult<()> {
        let entry = self
            .entry_mut(handle)
            .ok_or_else(|| TexflowError::not_found(format!("texture {handle}")))?;
        if !matches!(entry.slot, Slot::Lent) {
            return Err(TexflowError::dispatch(format!(
                "texture {handle} was not lent"
            )));
        }
        entry.slot = Slot::Live(texture);
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/arena.rs"]
mod tests;
