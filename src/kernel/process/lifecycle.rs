//! Process lifecycle management (§4.5).
//!
//! [`kill_process`] and [`wait_process`] implement the spec's logical
//! lifecycle — parent/child tree, orphan reparenting to PID 1, and the
//! killed-children semaphore protocol — against the same
//! [`PROCESS_TABLE`], independent of how a given process's address space
//! happens to be built. Concrete x86_64 process creation (page tables,
//! stacks, program image) is `process::create_process`/
//! `create_process_with_context`; `CreateProcess` itself is out of this
//! module's scope.

use crate::kernel::process::{Process, ProcessId, ProcessState, ProcessTable, PROCESS_TABLE, INIT_PID};

/// Terminates process `pid`, recording `retv` as its exit status
/// (§4.5 `KillProcess`).
///
/// Every not-yet-reaped child is reparented to [`INIT_PID`] (each adoption
/// releases one permit on PID 1's killed-children semaphore, per §4.5, so
/// `init` wakes to go collect its new zombies even though the children
/// themselves may not be terminated yet — `WaitProcess`'s failed-reap
/// bookkeeping absorbs that spurious wakeup). If the dying process's own
/// parent is PID 0 it self-reaps immediately; otherwise the parent's
/// killed-children semaphore gets one permit and teardown awaits that
/// parent's `wait`.
pub fn kill_process(pid: ProcessId, retv: i32) {
    kill_process_in(&mut PROCESS_TABLE.lock(), pid, retv);
    crate::debug_println!("[Process] Terminated PID={} with code={}", pid.as_u64(), retv);
}

/// Pure `KillProcess` logic, parametrised over the table it mutates so it
/// can be exercised against a private [`ProcessTable`] in tests instead of
/// the process-wide [`PROCESS_TABLE`] singleton (same split as
/// [`crate::kernel::cleaner::CleanerQueue`]).
fn kill_process_in(table: &mut ProcessTable, pid: ProcessId, retv: i32) {
    let (children, parent_pid) = match table.get_process_mut(pid) {
        Some(process) => {
            process.set_state(ProcessState::Terminated);
            process.set_exit_code(retv);
            (process.take_live_children(), process.parent_pid())
        }
        None => return,
    };

    for child in children {
        if let Some(c) = table.get_process_mut(child) {
            c.set_parent_pid(INIT_PID);
        }
        if let Some(init) = table.get_process_mut(INIT_PID) {
            init.add_live_child(child);
            init.killed_children().release(1);
        }
    }

    match parent_pid {
        None => {
            // Parent is PID 0: this process has no one to reap it, so it
            // reaps itself immediately (§4.5).
            table.remove_process(pid);
        }
        Some(ppid) => {
            if let Some(parent) = table.get_process_mut(ppid) {
                parent.killed_children().release(1);
                if parent.state() == ProcessState::Blocked {
                    parent.set_state(ProcessState::Ready);
                }
            }
        }
    }
}

/// Back-compat alias: earlier call sites spell this `terminate_process`.
pub fn terminate_process(pid: ProcessId, exit_code: i32) {
    kill_process(pid, exit_code);
}

/// Reasons [`wait_process`] can fail without reaping anything.
pub use crate::errors::unified::ProcessError as WaitError;

/// Blocks until a child matching `target` (or any child, if `target` is
/// `None`, mirroring `pid == -1`) has terminated, then reaps it and
/// returns its PID and `retv` (§4.5 `WaitProcess`).
///
/// Implements the spec's three-step loop exactly: acquire one
/// killed-children permit (blocking), scan live children for a terminated
/// match under the process-table lock, and on a miss remember the
/// permit as a "failed reap" to re-credit once a later iteration does
/// find a match — so a targeted `wait` never loses track of *other*
/// children that died in the meantime (§8 Property 5, §8 S3/S4).
pub fn wait_process(caller: ProcessId, target: Option<ProcessId>) -> Result<(ProcessId, i32), WaitError> {
    let mut failed_reaps: usize = 0;

    loop {
        // Block for one permit without holding the table lock across the
        // spin/yield loop inside CountingSemaphore::acquire (§5: a thread
        // must never suspend while holding a lock).
        loop {
            let acquired = {
                let table = PROCESS_TABLE.lock();
                match table.get_process(caller) {
                    Some(p) => p.killed_children().try_acquire(),
                    None => return Err(WaitError::NoSuchProcess),
                }
            };
            if acquired {
                break;
            }
            crate::kernel::scheduler::yield_now();
        }

        let mut table = PROCESS_TABLE.lock();
        match try_reap_in(&mut table, caller, target, failed_reaps) {
            ReapAttempt::Reaped(result) => return result,
            ReapAttempt::NoMatch => failed_reaps += 1,
        }
    }
}

/// Outcome of one already-acquired killed-children permit being spent
/// against the table: either it corresponded to a match (terminal, whether
/// success or a hard error) or it was spent in vain and must be remembered.
#[derive(Debug)]
enum ReapAttempt {
    Reaped(Result<(ProcessId, i32), WaitError>),
    NoMatch,
}

/// Pure one-shot `WaitProcess` scan: assumes the caller already holds one
/// killed-children permit and decides whether it corresponds to a
/// terminated child matching `target`. Parametrised over the table for the
/// same testability reason as [`kill_process_in`].
fn try_reap_in(table: &mut ProcessTable, caller: ProcessId, target: Option<ProcessId>, failed_reaps: usize) -> ReapAttempt {
    let children = match table.get_process(caller) {
        Some(p) => p.live_children().to_vec(),
        None => return ReapAttempt::Reaped(Err(WaitError::NoSuchProcess)),
    };

    if children.is_empty() {
        return ReapAttempt::Reaped(Err(WaitError::NoChildren));
    }

    let matched = children.iter().copied().find(|&child| {
        table
            .get_process(child)
            .is_some_and(|c| c.state() == ProcessState::Terminated && (target.is_none() || target == Some(child)))
    });

    let Some(child_pid) = matched else {
        // The permit we consumed didn't correspond to a matching
        // termination (either it was a spurious orphan-adoption wakeup,
        // or it belongs to a sibling `target` doesn't care about). Credit
        // it back once we do find our match, so sibling deaths are never
        // lost (§8 Property 5).
        return ReapAttempt::NoMatch;
    };

    let retv = table.get_process(child_pid).and_then(super::Process::exit_code).unwrap_or(0);

    if let Some(p) = table.get_process_mut(caller) {
        p.remove_live_child(child_pid);
    }
    table.remove_process(child_pid);

    if failed_reaps > 0 {
        if let Some(p) = table.get_process(caller) {
            p.killed_children().release(failed_reaps);
        }
    }

    ReapAttempt::Reaped(Ok((child_pid, retv)))
}

#[cfg(all(test, feature = "std-tests"))]
mod tests {
    use super::*;
    use x86_64::structures::paging::PhysFrame;
    use x86_64::{PhysAddr, VirtAddr};

    /// A process whose address-space fields are meaningless placeholders;
    /// `kill_process_in`/`try_reap_in` never touch them.
    fn dummy_process(pid: u64) -> Process {
        Process::new(
            ProcessId::new(pid),
            PhysFrame::containing_address(PhysAddr::new(0)),
            VirtAddr::new(0),
            VirtAddr::new(0),
            VirtAddr::new(0),
        )
    }

    fn spawn_child(table: &mut ProcessTable, parent: ProcessId, pid: u64) -> ProcessId {
        let mut child = dummy_process(pid);
        child.set_parent_pid(parent);
        let child_pid = table.add_process(child);
        if let Some(p) = table.get_process_mut(parent) {
            p.add_live_child(child_pid);
        }
        child_pid
    }

    /// Property 3: every PID handed out by the table is unique, and a
    /// freshly added process's own PID round-trips through lookup.
    #[test]
    fn pids_are_unique_and_round_trip() {
        let mut table = ProcessTable::new();
        let a = table.add_process(dummy_process(1));
        let b = table.add_process(dummy_process(2));
        assert_ne!(a, b);
        assert_eq!(table.get_process(a).unwrap().pid(), a);
        assert_eq!(table.get_process(b).unwrap().pid(), b);
    }

    /// Property 4: a parent that waits on every child (`target = None`)
    /// eventually observes each child's exit status exactly once, and no
    /// zombie remains in the table afterward.
    #[test]
    fn wait_any_reaps_every_child_exactly_once() {
        let mut table = ProcessTable::new();
        let parent = table.add_process(dummy_process(100));
        let children: Vec<ProcessId> = (0..4).map(|i| spawn_child(&mut table, parent, 101 + i)).collect();

        for (i, &child) in children.iter().enumerate() {
            kill_process_in(&mut table, child, i as i32);
        }

        let mut seen = Vec::new();
        let mut failed_reaps = 0;
        loop {
            let acquired = table.get_process(parent).unwrap().killed_children().try_acquire();
            if !acquired {
                break;
            }
            match try_reap_in(&mut table, parent, None, failed_reaps) {
                ReapAttempt::Reaped(Ok((pid, code))) => {
                    seen.push((pid, code));
                    failed_reaps = 0;
                }
                ReapAttempt::Reaped(Err(_)) => break,
                ReapAttempt::NoMatch => failed_reaps += 1,
            }
        }

        assert_eq!(seen.len(), children.len());
        let mut codes: Vec<i32> = seen.iter().map(|&(_, c)| c).collect();
        codes.sort_unstable();
        assert_eq!(codes, vec![0, 1, 2, 3]);
        for &child in &children {
            assert!(table.get_process(child).is_none());
        }
        assert!(table.get_process(parent).unwrap().live_children().is_empty());
    }

    /// Property 5 / Scenario S3: a targeted wait for the second child to
    /// die must not lose track of the first child's death — a later
    /// untargeted wait still observes it.
    #[test]
    fn targeted_wait_preserves_other_pending_deaths() {
        let mut table = ProcessTable::new();
        let parent = table.add_process(dummy_process(200));
        let a = spawn_child(&mut table, parent, 201);
        let b = spawn_child(&mut table, parent, 202);

        kill_process_in(&mut table, a, 10);
        kill_process_in(&mut table, b, 20);

        // One permit per death; acquire both up front the way the real
        // blocking wait_process would, one at a time.
        let mut failed_reaps = 0;
        let result_b = loop {
            assert!(table.get_process(parent).unwrap().killed_children().try_acquire());
            match try_reap_in(&mut table, parent, Some(b), failed_reaps) {
                ReapAttempt::Reaped(result) => break result,
                ReapAttempt::NoMatch => failed_reaps += 1,
            }
        };
        assert_eq!(result_b, Ok((b, 20)));

        // The credited-back permit for `a`'s death must still be there.
        let mut failed_reaps = 0;
        let result_a = loop {
            assert!(table.get_process(parent).unwrap().killed_children().try_acquire());
            match try_reap_in(&mut table, parent, None, failed_reaps) {
                ReapAttempt::Reaped(result) => break result,
                ReapAttempt::NoMatch => failed_reaps += 1,
            }
        };
        assert_eq!(result_a, Ok((a, 10)));
    }

    /// Property 6 / Scenario S4: when a process dies before its own
    /// children are reaped, those children are adopted by PID 1, and
    /// PID 1 gains a killed-children permit for each even though the
    /// grandchildren are still alive.
    #[test]
    fn orphans_are_reparented_to_init() {
        let mut table = ProcessTable::new();
        let init = table.add_process(dummy_process(1));
        let middle = table.add_process(dummy_process(300));
        if let Some(i) = table.get_process_mut(init) {
            i.add_live_child(middle);
        }
        let grandchild = spawn_child(&mut table, middle, 301);

        // The grandchild is still alive; `middle` dies anyway.
        kill_process_in(&mut table, middle, 0);

        assert_eq!(table.get_process(grandchild).unwrap().parent_pid(), Some(init));
        assert!(table.get_process(init).unwrap().live_children().contains(&grandchild));
        assert!(table.get_process(middle).is_none());

        // init got a permit for the adoption even though the grandchild
        // hasn't died yet; wait(-1) must not report a false match.
        assert!(table.get_process(init).unwrap().killed_children().try_acquire());
        match try_reap_in(&mut table, init, None, 0) {
            ReapAttempt::NoMatch => {}
            other => panic!("expected a failed reap for the still-alive grandchild, got a match: {other:?}"),
        }

        // Once the grandchild actually dies, the credited-back permit
        // (from the NoMatch above) plus this new one let init reap it.
        kill_process_in(&mut table, grandchild, 7);
        assert!(table.get_process(init).unwrap().killed_children().try_acquire());
        let result = try_reap_in(&mut table, init, None, 1);
        match result {
            ReapAttempt::Reaped(Ok((pid, code))) => {
                assert_eq!(pid, grandchild);
                assert_eq!(code, 7);
            }
            _ => panic!("expected grandchild to be reaped"),
        }
    }

    /// A process with no children at all fails `wait` immediately rather
    /// than blocking forever.
    #[test]
    fn wait_with_no_children_reports_no_children() {
        let mut table = ProcessTable::new();
        let lonely = table.add_process(dummy_process(400));
        match try_reap_in(&mut table, lonely, None, 0) {
            ReapAttempt::Reaped(Err(WaitError::NoChildren)) => {}
            other => panic!("expected NoChildren, got a non-error result: {other:?}"),
        }
    }
}
