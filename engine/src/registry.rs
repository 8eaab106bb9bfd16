//! The registry (C3): the mapping from thread to region, and the page table
//! behind it.
//!
//! Every method here is called with the gate held, so internal mutation
//! needs no locking of its own. The one exception is the fault handler's
//! view of live page bases, which must stay reachable without the gate --
//! see [`crate::fault`] for the lock-free snapshot this module publishes
//! to on every mutation that changes the set of live pages.

use std::collections::HashMap;

use abi::ThreadId;

use crate::err::{Error, Result};
use crate::fault;
use crate::page::{Page, PageId, Protection};

struct Region {
    page: PageId,
}

/// Registry of thread-private storage regions, plus the page table they
/// reference.
#[derive(Default)]
pub struct Registry {
    regions: HashMap<ThreadId, Region>,
    pages: HashMap<PageId, Page>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn republish(&self) {
        let mut bases: Vec<usize> = self.pages.keys().map(|p| p.addr()).collect();
        bases.sort_unstable();
        fault::publish(bases);
    }

    pub fn has_region(&self, tid: ThreadId) -> bool {
        self.regions.contains_key(&tid)
    }

    pub fn create(&mut self, tid: ThreadId, page_bytes: usize) -> Result<()> {
        if self.has_region(tid) {
            return Err(Error::Exists);
        }
        let page = Page::map(page_bytes)?;
        let id = page.id();
        self.pages.insert(id, page);
        self.regions.insert(tid, Region { page: id });
        self.republish();
        Ok(())
    }

    pub fn destroy(&mut self, tid: ThreadId, page_bytes: usize) -> Result<()> {
        let region = self.regions.remove(&tid).ok_or(Error::NoRegion)?;
        let remaining = {
            let page = self
                .pages
                .get_mut(&region.page)
                .expect("page table out of sync with registry");
            page.dec_ref()
        };
        if remaining == 0 {
            let page = self.pages.remove(&region.page).expect("just checked above");
            page.unmap(page_bytes)?;
        }
        self.republish();
        Ok(())
    }

    pub fn read(&mut self, tid: ThreadId, offset: usize, buf: &mut [u8], page_bytes: usize) -> Result<()> {
        let page_id = self.regions.get(&tid).ok_or(Error::NoRegion)?.page;
        let page = self
            .pages
            .get_mut(&page_id)
            .expect("page table out of sync with registry");
        page.set_protection(page_bytes, Protection::Read)?;
        // Safety: protection was just transitioned to READ; the caller
        // validated offset + buf.len() <= page_bytes.
        unsafe { page.read_into(offset, buf) };
        page.set_protection(page_bytes, Protection::None)?;
        Ok(())
    }

    /// Writes `buf` at `offset` into the calling thread's region.
    ///
    /// If the backing page is exclusively owned, this writes in place. If
    /// it is shared, this performs copy-on-write: a fresh page is
    /// allocated and populated with the old page's contents before the
    /// write is applied, and the thread's region is retargeted to the new
    /// page. Allocation is attempted before any refcount or region state
    /// is touched, so a failed allocation leaves the registry exactly as
    /// it was.
    pub fn write(&mut self, tid: ThreadId, offset: usize, buf: &[u8], page_bytes: usize) -> Result<()> {
        let old_id = self.regions.get(&tid).ok_or(Error::NoRegion)?.page;
        let refcount = self
            .pages
            .get(&old_id)
            .expect("page table out of sync with registry")
            .refcount();

        if refcount == 1 {
            let page = self.pages.get_mut(&old_id).expect("checked above");
            page.set_protection(page_bytes, Protection::ReadWrite)?;
            unsafe { page.write_from(offset, buf) };
            page.set_protection(page_bytes, Protection::None)?;
            return Ok(());
        }

        let new_page = Page::map(page_bytes)?;
        let new_id = new_page.id();
        let new_addr = new_id.addr();
        let old_addr = old_id.addr();

        self.pages.get_mut(&old_id).expect("checked above").dec_ref();
        self.pages.insert(new_id, new_page);

        self.pages
            .get_mut(&old_id)
            .expect("just decremented")
            .set_protection(page_bytes, Protection::Read)?;
        self.pages
            .get_mut(&new_id)
            .expect("just inserted")
            .set_protection(page_bytes, Protection::ReadWrite)?;

        // Safety: old page is READ and new page is READ_WRITE, both cover
        // page_bytes.
        unsafe { crate::page::copy_page(old_addr, new_addr, page_bytes) };
        // Safety: new page is READ_WRITE; the caller validated the range.
        unsafe {
            self.pages
                .get(&new_id)
                .expect("just inserted")
                .write_from(offset, buf)
        };

        self.pages
            .get_mut(&old_id)
            .expect("checked above")
            .set_protection(page_bytes, Protection::None)?;
        self.pages
            .get_mut(&new_id)
            .expect("just inserted")
            .set_protection(page_bytes, Protection::None)?;

        self.regions.get_mut(&tid).expect("checked above").page = new_id;
        self.republish();
        Ok(())
    }

    /// Makes `tid` a new sharer of `source`'s page.
    pub fn clone_from(&mut self, tid: ThreadId, source: ThreadId) -> Result<()> {
        if self.has_region(tid) {
            return Err(Error::Exists);
        }
        let source_page = self.regions.get(&source).ok_or(Error::NoRegion)?.page;
        self.pages
            .get_mut(&source_page)
            .expect("page table out of sync with registry")
            .inc_ref();
        self.regions.insert(tid, Region { page: source_page });
        // The set of live page bases is unchanged, so no republish is
        // needed.
        Ok(())
    }

    /// Returns the base address of `tid`'s page, for callers that need to
    /// demonstrate the fault interceptor by dereferencing it directly.
    pub fn region_base(&self, tid: ThreadId) -> Result<usize> {
        self.regions
            .get(&tid)
            .map(|r| r.page.addr())
            .ok_or(Error::NoRegion)
    }
}
