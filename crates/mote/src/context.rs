// SPDX-License-Identifier: Apache-2.0
//! Per-operation serialization state.
//!
//! One context exists per serialize or deserialize call and is threaded
//! by mutable reference through every converter. Contexts are never
//! shared across threads; everything shareable (options, converters)
//! lives in the cache instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use mote_wire::Depth;

use crate::error::Error;
use crate::interner::StringInterner;
use crate::options::{RefMode, SerializerOptions};
use crate::refs::{ReadTracker, WriteTracker};

/// Cooperative cancellation flag.
///
/// Converters observe it at container boundaries (array/map/object
/// enter), not inside primitive token reads. Cancelling mid-write leaves
/// the sink structurally incomplete by design; callers abandon the
/// output.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Option<Arc<AtomicBool>>,
}

impl CancellationToken {
    /// A token that can actually be cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            flag: Some(Arc::new(AtomicBool::new(false))),
        }
    }

    /// A token that never cancels.
    #[must_use]
    pub const fn none() -> Self {
        Self { flag: None }
    }

    /// Requests cancellation; observed at the next container boundary.
    pub fn cancel(&self) {
        if let Some(flag) = &self.flag {
            flag.store(true, Ordering::Relaxed);
        }
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    pub(crate) fn check(&self) -> Result<(), Error> {
        if self.is_cancelled() {
            Err(Error::OperationCancelled)
        } else {
            Ok(())
        }
    }
}

/// Mutable state for one serialize call.
#[derive(Debug)]
pub struct WriteContext<'cx> {
    options: &'cx SerializerOptions,
    depth: Depth,
    cancel: CancellationToken,
    tracker: Option<WriteTracker>,
}

impl<'cx> WriteContext<'cx> {
    pub(crate) fn new(options: &'cx SerializerOptions, cancel: CancellationToken) -> Self {
        let tracker = match options.preserve_references {
            RefMode::Off => None,
            RefMode::RejectCycles | RefMode::AllowCycles => Some(WriteTracker::default()),
        };
        Self {
            options,
            depth: Depth::new(options.max_depth),
            cancel,
            tracker,
        }
    }

    /// The policy snapshot this operation runs under.
    #[must_use]
    pub fn options(&self) -> &'cx SerializerOptions {
        self.options
    }

    /// Enters a container: checks cancellation, then the depth ceiling.
    pub fn enter(&mut self) -> Result<(), Error> {
        self.cancel.check()?;
        self.depth
            .enter()
            .map_err(|_| Error::DepthLimitExceeded {
                limit: self.options.max_depth,
            })
    }

    /// Leaves a container entered with [`WriteContext::enter`].
    pub fn exit(&mut self) {
        self.depth.exit();
    }

    pub(crate) fn tracker_mut(&mut self) -> Option<&mut WriteTracker> {
        self.tracker.as_mut()
    }
}

/// Mutable state for one deserialize call.
#[derive(Debug)]
pub struct ReadContext<'cx> {
    options: &'cx SerializerOptions,
    depth: Depth,
    cancel: CancellationToken,
    tracker: Option<ReadTracker>,
    interner: Option<StringInterner>,
    backing: Option<Bytes>,
}

impl<'cx> ReadContext<'cx> {
    pub(crate) fn new(
        options: &'cx SerializerOptions,
        cancel: CancellationToken,
        backing: Option<Bytes>,
    ) -> Self {
        let tracker = match options.preserve_references {
            RefMode::Off => None,
            RefMode::RejectCycles | RefMode::AllowCycles => Some(ReadTracker::default()),
        };
        let interner = options.intern_strings.then(StringInterner::default);
        Self {
            options,
            depth: Depth::new(options.max_depth),
            cancel,
            tracker,
            interner,
            backing,
        }
    }

    /// The policy snapshot this operation runs under.
    #[must_use]
    pub fn options(&self) -> &'cx SerializerOptions {
        self.options
    }

    /// Enters a container: checks cancellation, then the depth ceiling.
    pub fn enter(&mut self) -> Result<(), Error> {
        self.cancel.check()?;
        self.depth
            .enter()
            .map_err(|_| Error::DepthLimitExceeded {
                limit: self.options.max_depth,
            })
    }

    /// Leaves a container entered with [`ReadContext::enter`].
    pub fn exit(&mut self) {
        self.depth.exit();
    }

    /// Depth counter, shared with wire-level `skip` so skipped subtrees
    /// observe the same ceiling as decoded ones.
    pub fn depth_mut(&mut self) -> &mut Depth {
        &mut self.depth
    }

    /// The shared buffer the reader is decoding from, when the caller
    /// provided one. Byte-range values slice it instead of copying.
    #[must_use]
    pub fn backing(&self) -> Option<&Bytes> {
        self.backing.as_ref()
    }

    /// Interns `text` when interning is on; allocates otherwise.
    pub fn intern(&mut self, text: &str) -> Arc<str> {
        match &mut self.interner {
            Some(interner) => interner.intern(text),
            None => Arc::from(text),
        }
    }

    pub(crate) fn tracker_mut(&mut self) -> Option<&mut ReadTracker> {
        self.tracker.as_mut()
    }
}
