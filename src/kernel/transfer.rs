// src/kernel/transfer.rs

//! User/kernel transfer layer (§4.1).
//!
//! Every byte that crosses the user/kernel trust boundary — syscall
//! arguments, PTY I/O, ELF driver images — goes through a [`Transfer`]
//! cursor. User-kind transfers are validated against the page permission
//! bits before a single byte moves; intra-kernel transfers skip validation
//! entirely and allow overlapping ranges, matching `memmove` rather than
//! `memcpy`.

use crate::errors::unified::TransferError;
use crate::kernel::config::{PAGE_SIZE, USER_AREA_BASE, USER_AREA_LIMIT};

/// Result type for transfer operations, carrying the POSIX-flavoured
/// [`TransferError`] rather than a bare bool.
pub type TransferResult<T> = Result<T, TransferError>;

/// Permission bits the transfer layer checks against a user page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePermissions(u8);

impl PagePermissions {
    pub const READ: PagePermissions = PagePermissions(0b0001);
    pub const WRITE: PagePermissions = PagePermissions(0b0010);
    pub const EXEC: PagePermissions = PagePermissions(0b0100);
    pub const USER: PagePermissions = PagePermissions(0b1000);
    pub const NONE: PagePermissions = PagePermissions(0);

    pub const fn contains(self, other: PagePermissions) -> bool {
        self.0 & other.0 == other.0
    }
}

impl core::ops::BitOr for PagePermissions {
    type Output = PagePermissions;
    fn bitor(self, rhs: PagePermissions) -> PagePermissions {
        PagePermissions(self.0 | rhs.0)
    }
}

/// The external contract the transfer layer consumes to learn a user page's
/// permission bits. Real paging internals are out of scope for this core
/// (§1); this trait is the named seam the spec requires, with the real
/// implementation delegating to whatever VAS abstraction backs the running
/// process and a trivial in-memory mock standing in for it under test.
pub trait PagePermissionSource {
    /// Returns the permission bits mapped at `page_addr` (page-aligned), or
    /// `None` if the page is unmapped.
    fn permissions(&self, page_addr: usize) -> Option<PagePermissions>;
}

/// Direction of a transfer, from the kernel's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// The kernel is reading from the address (the kernel writes *to* user
    /// memory when the user wants to read kernel data).
    Read,
    /// The kernel is writing to the address.
    Write,
}

/// Whether a transfer crosses the user/kernel boundary or stays within
/// trusted kernel memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Validated, user-facing address; goes through [`PagePermissionSource`].
    Usermode,
    /// Trusted kernel-to-kernel move; `memmove` semantics, no validation.
    IntraKernel,
}

/// A cursor over an untrusted or trusted buffer, mutated in place by each
/// call to [`Transfer::perform`].
pub struct Transfer {
    address: usize,
    direction: Direction,
    length_remaining: u64,
    offset: u64,
    kind: Kind,
}

impl Transfer {
    /// Creates an intra-kernel transfer cursor.
    pub fn kernel(address: usize, length: u64, offset: u64, direction: Direction) -> Self {
        Self {
            address,
            direction,
            length_remaining: length,
            offset,
            kind: Kind::IntraKernel,
        }
    }

    /// Creates a cursor for the kernel writing into user memory (i.e. the
    /// user is performing a *read*).
    pub fn writing_to_user(address: usize, length: u64, offset: u64) -> Self {
        Self {
            address,
            direction: Direction::Read,
            length_remaining: length,
            offset,
            kind: Kind::Usermode,
        }
    }

    /// Creates a cursor for the kernel reading from user memory (i.e. the
    /// user is performing a *write*).
    pub fn reading_from_user(address: usize, length: u64, offset: u64) -> Self {
        Self {
            address,
            direction: Direction::Write,
            length_remaining: length,
            offset,
            kind: Kind::IntraKernel, // placeholder, corrected below
        }
        .into_usermode()
    }

    fn into_usermode(mut self) -> Self {
        self.kind = Kind::Usermode;
        self
    }

    /// Bytes left to transfer.
    pub fn length_remaining(&self) -> u64 {
        self.length_remaining
    }

    /// Bytes transferred so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Validates `[addr, addr + size)` against the user address range and,
    /// via `source`, every covered page's permission bits (§4.1 rules 1-3).
    fn validate(
        source: &dyn PagePermissionSource,
        addr: usize,
        size: u64,
        write: bool,
    ) -> TransferResult<()> {
        let initial = addr;
        let final_addr = initial
            .checked_add(size as usize)
            .ok_or(TransferError::InvalidUserRange)?;

        if initial < USER_AREA_BASE || initial >= USER_AREA_LIMIT {
            return Err(TransferError::InvalidUserRange);
        }
        if final_addr < USER_AREA_BASE || final_addr > USER_AREA_LIMIT {
            return Err(TransferError::InvalidUserRange);
        }

        let initial_page = initial / PAGE_SIZE;
        let last_page = (initial + size as usize - 1) / PAGE_SIZE;

        for page_addr in (initial_page..=last_page).map(|p| p * PAGE_SIZE) {
            let perms = source
                .permissions(page_addr)
                .ok_or(TransferError::InvalidUserRange)?;

            if !perms.contains(PagePermissions::READ) {
                return Err(TransferError::InvalidUserRange);
            }
            if !perms.contains(PagePermissions::USER) {
                return Err(TransferError::InvalidUserRange);
            }
            if write && !perms.contains(PagePermissions::WRITE) {
                return Err(TransferError::InvalidUserRange);
            }
            if write && perms.contains(PagePermissions::EXEC) {
                return Err(TransferError::InvalidUserRange);
            }
        }

        Ok(())
    }

    /// Moves up to `len` bytes between `trusted` and the cursor's address,
    /// validating first for usermode transfers. On success the cursor
    /// advances by the amount actually moved; on failure nothing is moved
    /// and the cursor is unchanged (§7: transfers never partially succeed
    /// and report error).
    ///
    /// # Safety
    ///
    /// `trusted` must point to at least `len` bytes of valid, appropriately
    /// aligned memory for the transfer's direction, and the cursor's
    /// `address` must be a raw byte pointer with at least
    /// `length_remaining` bytes available once validated.
    pub unsafe fn perform(
        &mut self,
        source: &dyn PagePermissionSource,
        trusted: *mut u8,
        len: u64,
    ) -> TransferResult<u64> {
        let amount = len.min(self.length_remaining);
        if amount == 0 {
            return Ok(0);
        }

        match self.kind {
            Kind::IntraKernel => {
                let user_ptr = self.address as *mut u8;
                // SAFETY: caller guarantees both ranges are valid; intra-kernel
                // moves are permitted to overlap, hence `copy` not
                // `copy_nonoverlapping`.
                unsafe {
                    match self.direction {
                        Direction::Read => {
                            core::ptr::copy(trusted as *const u8, user_ptr, amount as usize)
                        }
                        Direction::Write => {
                            core::ptr::copy(user_ptr, trusted, amount as usize)
                        }
                    }
                }
            }
            Kind::Usermode => {
                let write = matches!(self.direction, Direction::Read);
                Self::validate(source, self.address, amount, write)?;
                let user_ptr = self.address as *mut u8;
                // SAFETY: validated above; ranges are user/kernel and do not
                // overlap, so a non-overlapping copy is correct.
                unsafe {
                    match self.direction {
                        Direction::Read => core::ptr::copy_nonoverlapping(
                            trusted as *const u8,
                            user_ptr,
                            amount as usize,
                        ),
                        Direction::Write => core::ptr::copy_nonoverlapping(
                            user_ptr,
                            trusted,
                            amount as usize,
                        ),
                    }
                }
            }
        }

        self.length_remaining -= amount;
        self.offset += amount;
        self.address += amount as usize;

        Ok(amount)
    }
}

/// Writes a NUL-terminated, `max_length`-bounded string from kernel memory
/// into user memory, guaranteeing the terminator is written within the
/// reported length on success.
///
/// # Safety
///
/// `user_buffer` must address at least `max_length` bytes of user memory.
pub unsafe fn write_string_to_usermode(
    source: &dyn PagePermissionSource,
    trusted_string: &str,
    user_buffer: usize,
    max_length: u64,
) -> TransferResult<()> {
    let mut tr = Transfer::writing_to_user(user_buffer, max_length, 0);
    let bytes = trusted_string.as_bytes();
    let size = if (bytes.len() as u64) < max_length {
        bytes.len() as u64
    } else {
        max_length.saturating_sub(1)
    };

    // SAFETY: `bytes` is a valid kernel slice of at least `size` bytes;
    // delegated to the caller's contract on `user_buffer`.
    unsafe {
        tr.perform(source, bytes.as_ptr() as *mut u8, size)?;
    }
    let zero: u8 = 0;
    // SAFETY: same contract, one more byte for the terminator.
    unsafe {
        tr.perform(source, &zero as *const u8 as *mut u8, 1)?;
    }
    Ok(())
}

/// Reads a NUL-terminated string of at most `max_length - 1` bytes from user
/// memory into `trusted_buffer`, which must be at least `max_length` bytes.
///
/// # Safety
///
/// `user_string` must address at least `max_length` bytes of user memory.
pub unsafe fn read_string_from_usermode(
    source: &dyn PagePermissionSource,
    trusted_buffer: &mut [u8],
    user_string: usize,
    max_length: u64,
) -> TransferResult<usize> {
    let mut tr = Transfer::reading_from_user(user_string, max_length, 0);
    let mut i = 0usize;
    let mut remaining = max_length;

    while remaining > 1 {
        remaining -= 1;
        let mut c: u8 = 0;
        // SAFETY: one byte at a time, bounded by `max_length`.
        unsafe {
            tr.perform(source, &mut c as *mut u8, 1)?;
        }
        trusted_buffer[i] = c;
        i += 1;
        if c == 0 {
            break;
        }
    }
    trusted_buffer[i.min(trusted_buffer.len() - 1)] = 0;
    Ok(i)
}

/// Writes a single machine word to user memory.
///
/// # Safety
///
/// `user_location` must address at least `size_of::<usize>()` bytes.
pub unsafe fn write_word_to_usermode(
    source: &dyn PagePermissionSource,
    user_location: usize,
    value: usize,
) -> TransferResult<()> {
    let mut tr = Transfer::writing_to_user(user_location, core::mem::size_of::<usize>() as u64, 0);
    let mut value = value;
    // SAFETY: `value` is a valid local of the right size.
    unsafe {
        tr.perform(
            source,
            &mut value as *mut usize as *mut u8,
            core::mem::size_of::<usize>() as u64,
        )?;
    }
    if tr.length_remaining() != 0 {
        return Err(TransferError::InvalidUserRange);
    }
    Ok(())
}

/// Reads a single machine word from user memory.
///
/// # Safety
///
/// `user_location` must address at least `size_of::<usize>()` bytes.
pub unsafe fn read_word_from_usermode(
    source: &dyn PagePermissionSource,
    user_location: usize,
) -> TransferResult<usize> {
    let mut tr = Transfer::reading_from_user(user_location, core::mem::size_of::<usize>() as u64, 0);
    let mut output: usize = 0;
    // SAFETY: `output` is a valid local of the right size.
    unsafe {
        tr.perform(
            source,
            &mut output as *mut usize as *mut u8,
            core::mem::size_of::<usize>() as u64,
        )?;
    }
    if tr.length_remaining() != 0 {
        return Err(TransferError::InvalidUserRange);
    }
    Ok(output)
}

#[cfg(all(test, feature = "std-tests"))]
mod tests {
    use super::*;
    use alloc::collections::BTreeMap;

    struct MockPages(BTreeMap<usize, PagePermissions>);

    impl PagePermissionSource for MockPages {
        fn permissions(&self, page_addr: usize) -> Option<PagePermissions> {
            self.0.get(&page_addr).copied()
        }
    }

    fn one_page_table(base: usize, perms: PagePermissions) -> MockPages {
        MockPages(BTreeMap::from([(base, perms)]))
    }

    #[test]
    fn intra_kernel_allows_overlap_and_skips_validation() {
        let source = MockPages(BTreeMap::new());
        let mut buf = *b"hello world";
        let mut tr = Transfer::kernel(buf.as_mut_ptr() as usize + 2, 5, 0, Direction::Write);
        let mut dst = [0u8; 5];
        unsafe {
            tr.perform(&source, dst.as_mut_ptr(), 5).unwrap();
        }
        assert_eq!(&dst, b"llo w");
    }

    #[test]
    fn read_only_page_allows_read_transfer() {
        let base = USER_AREA_BASE;
        let source = one_page_table(base, PagePermissions::READ | PagePermissions::USER);
        let mut tr = Transfer::reading_from_user(base, 4, 0);
        let src = *b"abcd";
        let n = unsafe { tr.perform(&source, src.as_ptr() as *mut u8, 4).unwrap() };
        assert_eq!(n, 4);
        assert_eq!(tr.length_remaining(), 0);
    }

    #[test]
    fn read_only_page_rejects_write_transfer() {
        let base = USER_AREA_BASE;
        let source = one_page_table(base, PagePermissions::READ | PagePermissions::USER);
        let mut tr = Transfer::writing_to_user(base, 4, 0);
        let mut dst = [0u8; 4];
        let result = unsafe { tr.perform(&source, dst.as_mut_ptr(), 4) };
        assert_eq!(result, Err(TransferError::InvalidUserRange));
        assert_eq!(tr.length_remaining(), 4);
    }

    #[test]
    fn writable_page_allows_write_transfer() {
        let base = USER_AREA_BASE;
        let source = one_page_table(
            base,
            PagePermissions::READ | PagePermissions::WRITE | PagePermissions::USER,
        );
        let mut tr = Transfer::writing_to_user(base, 4, 0);
        let mut dst = [0u8; 4];
        let n = unsafe { tr.perform(&source, dst.as_mut_ptr(), 4).unwrap() };
        assert_eq!(n, 4);
        assert_eq!(tr.length_remaining(), 0);
    }

    #[test]
    fn write_transfer_rejects_executable_page() {
        let base = USER_AREA_BASE;
        let source = one_page_table(
            base,
            PagePermissions::READ | PagePermissions::WRITE | PagePermissions::USER | PagePermissions::EXEC,
        );
        let mut tr = Transfer::writing_to_user(base, 4, 0);
        let mut dst = [0u8; 4];
        let result = unsafe { tr.perform(&source, dst.as_mut_ptr(), 4) };
        assert_eq!(result, Err(TransferError::InvalidUserRange));
    }

    #[test]
    fn out_of_range_address_is_rejected() {
        let source = MockPages(BTreeMap::new());
        let mut tr = Transfer::writing_to_user(USER_AREA_LIMIT - 2, 4, 0);
        let mut dst = [0u8; 4];
        let result = unsafe { tr.perform(&source, dst.as_mut_ptr(), 4) };
        assert_eq!(result, Err(TransferError::InvalidUserRange));
    }

    #[test]
    fn range_ending_exactly_at_user_area_limit_is_accepted() {
        let last_page = USER_AREA_LIMIT - PAGE_SIZE;
        let source = one_page_table(
            last_page,
            PagePermissions::READ | PagePermissions::WRITE | PagePermissions::USER,
        );
        let mut tr = Transfer::writing_to_user(USER_AREA_LIMIT - 4, 4, 0);
        let mut dst = [0u8; 4];
        let n = unsafe { tr.perform(&source, dst.as_mut_ptr(), 4).unwrap() };
        assert_eq!(n, 4);
    }

    #[test]
    fn cursor_advances_by_amount_moved() {
        let base = USER_AREA_BASE;
        let source = one_page_table(
            base,
            PagePermissions::READ | PagePermissions::WRITE | PagePermissions::USER,
        );
        let mut tr = Transfer::reading_from_user(base, 10, 0);
        let src = [0u8; 4];
        unsafe {
            tr.perform(&source, src.as_ptr() as *mut u8, 4).unwrap();
        }
        assert_eq!(tr.length_remaining(), 6);
        assert_eq!(tr.offset(), 4);
    }
}
