//! Virtual Desktop body state snapshot layout
//!
//! The streamer writes one `RawSnapshot` into shared memory per tracking
//! update. The layout is sequential with natural alignment (360 bytes):
//!   - u8 face_is_valid (1 byte)
//!   - u8 is_eye_following_blendshapes_valid (1 byte)
//!   - padding (2 bytes)
//!   - 70×f32 expression weights (280 bytes)
//!   - 2×f32 expression confidences (8 bytes): lower face, upper face
//!   - u8 left_eye_is_valid (1 byte)
//!   - u8 right_eye_is_valid (1 byte)
//!   - padding (2 bytes)
//!   - left eye pose: 4×f32 quaternion + 3×f32 position (28 bytes)
//!   - right eye pose (28 bytes)
//!   - f32 left_eye_confidence (4 bytes)
//!   - f32 right_eye_confidence (4 bytes)
//!   Total: 4+280+8+4+28+28+4+4 = 360 bytes
//!
//! Booleans are kept as raw bytes: the producer may leave any value in them
//! and only `byte != 0` is meaningful.

use bytemuck::{Pod, Zeroable};
use std::marker::PhantomData;
use std::mem::{offset_of, size_of};
use std::ptr::{self, NonNull};

/// Number of actuator weights in a snapshot
pub const EXPRESSION_COUNT: usize = 70;

/// Number of expression confidence values (lower face, upper face)
pub const CONFIDENCE_COUNT: usize = 2;

/// Size of the shared segment in bytes
pub const SNAPSHOT_SIZE: usize = 360;

/// Orientation quaternion (x, y, z, w)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quaternion {
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<Quaternion> for glam::Quat {
    fn from(q: Quaternion) -> Self {
        glam::Quat::from_xyzw(q.x, q.y, q.z, q.w)
    }
}

impl From<glam::Quat> for Quaternion {
    fn from(q: glam::Quat) -> Self {
        Self::new(q.x, q.y, q.z, q.w)
    }
}

/// Position (x, y, z)
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Eye pose; only the orientation drives gaze
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Pose {
    pub orientation: Quaternion,
    pub position: Vector3,
}

impl Pose {
    pub const IDENTITY: Self = Self {
        orientation: Quaternion::IDENTITY,
        position: Vector3 {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        },
    };
}

/// One producer snapshot, byte-for-byte as it sits in shared memory
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct RawSnapshot {
    pub face_is_valid: u8,
    pub is_eye_following_blendshapes_valid: u8,
    _pad0: [u8; 2],
    pub expression_weights: [f32; EXPRESSION_COUNT],
    pub expression_confidences: [f32; CONFIDENCE_COUNT],
    pub left_eye_is_valid: u8,
    pub right_eye_is_valid: u8,
    _pad1: [u8; 2],
    pub left_eye_pose: Pose,
    pub right_eye_pose: Pose,
    pub left_eye_confidence: f32,
    pub right_eye_confidence: f32,
}

const _: () = {
    assert!(size_of::<RawSnapshot>() == SNAPSHOT_SIZE);
    assert!(offset_of!(RawSnapshot, expression_weights) == 4);
    assert!(offset_of!(RawSnapshot, expression_confidences) == 284);
    assert!(offset_of!(RawSnapshot, left_eye_is_valid) == 292);
    assert!(offset_of!(RawSnapshot, left_eye_pose) == 296);
    assert!(offset_of!(RawSnapshot, right_eye_pose) == 324);
    assert!(offset_of!(RawSnapshot, left_eye_confidence) == 352);
    assert!(offset_of!(RawSnapshot, right_eye_confidence) == 356);
};

impl Default for RawSnapshot {
    fn default() -> Self {
        Self::identity()
    }
}

impl RawSnapshot {
    /// Nothing valid, zero weights, both eyes looking straight ahead
    pub fn identity() -> Self {
        Self {
            left_eye_pose: Pose::IDENTITY,
            right_eye_pose: Pose::IDENTITY,
            ..Zeroable::zeroed()
        }
    }

    /// Reinterpret a byte buffer as a snapshot.
    ///
    /// Returns `None` unless the buffer is exactly `SNAPSHOT_SIZE` bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        bytemuck::try_pod_read_unaligned(bytes).ok()
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    pub fn set_face_valid(&mut self, valid: bool) {
        self.face_is_valid = valid as u8;
    }

    pub fn set_eye_following_valid(&mut self, valid: bool) {
        self.is_eye_following_blendshapes_valid = valid as u8;
    }

    pub fn set_eyes_valid(&mut self, left: bool, right: bool) {
        self.left_eye_is_valid = left as u8;
        self.right_eye_is_valid = right as u8;
    }

    pub fn set_weight(&mut self, expression: crate::expression::FaceExpression, value: f32) {
        self.expression_weights[expression.index()] = value;
    }

    pub fn view(&self) -> SnapshotView<'_> {
        SnapshotView::from_ref(self)
    }
}

/// Read a single field through the view pointer without caching
macro_rules! volatile_field {
    ($view:expr, $field:ident) => {
        // SAFETY: the pointer is valid and aligned for the view's lifetime
        // (see `SnapshotView::from_raw`) and every field is plain old data.
        unsafe { ptr::addr_of!((*$view.ptr.as_ptr()).$field).read_volatile() }
    };
}

/// Zero-copy, read-only view of a snapshot.
///
/// The region may be rewritten by the producer at any moment without a lock.
/// Every accessor performs a fresh volatile read, so two reads within one tick
/// can observe different producer updates (a torn snapshot). Callers tolerate
/// that; the next tick sees a consistent state again.
#[derive(Clone, Copy)]
pub struct SnapshotView<'a> {
    ptr: NonNull<RawSnapshot>,
    _region: PhantomData<&'a RawSnapshot>,
}

impl<'a> SnapshotView<'a> {
    /// Create a view over foreign memory.
    ///
    /// # Safety
    /// `ptr` must point to at least `SNAPSHOT_SIZE` readable bytes, aligned
    /// for `RawSnapshot`, that stay mapped for all of `'a`.
    pub unsafe fn from_raw(ptr: NonNull<RawSnapshot>) -> Self {
        Self {
            ptr,
            _region: PhantomData,
        }
    }

    pub fn from_ref(snapshot: &'a RawSnapshot) -> Self {
        Self {
            ptr: NonNull::from(snapshot),
            _region: PhantomData,
        }
    }

    pub fn face_is_valid(&self) -> bool {
        volatile_field!(self, face_is_valid) != 0
    }

    pub fn is_eye_following_blendshapes_valid(&self) -> bool {
        volatile_field!(self, is_eye_following_blendshapes_valid) != 0
    }

    pub fn left_eye_is_valid(&self) -> bool {
        volatile_field!(self, left_eye_is_valid) != 0
    }

    pub fn right_eye_is_valid(&self) -> bool {
        volatile_field!(self, right_eye_is_valid) != 0
    }

    /// Liveness check: any of the four validity flags set
    pub fn any_valid(&self) -> bool {
        self.left_eye_is_valid()
            || self.right_eye_is_valid()
            || self.is_eye_following_blendshapes_valid()
            || self.face_is_valid()
    }

    pub fn expression_weights(&self) -> [f32; EXPRESSION_COUNT] {
        volatile_field!(self, expression_weights)
    }

    pub fn expression_confidences(&self) -> [f32; CONFIDENCE_COUNT] {
        volatile_field!(self, expression_confidences)
    }

    pub fn left_eye_pose(&self) -> Pose {
        volatile_field!(self, left_eye_pose)
    }

    pub fn right_eye_pose(&self) -> Pose {
        volatile_field!(self, right_eye_pose)
    }

    pub fn left_eye_confidence(&self) -> f32 {
        volatile_field!(self, left_eye_confidence)
    }

    pub fn right_eye_confidence(&self) -> f32 {
        volatile_field!(self, right_eye_confidence)
    }

    /// Copy the whole region out in one read
    pub fn load(&self) -> RawSnapshot {
        // SAFETY: see `volatile_field!`
        unsafe { self.ptr.as_ptr().read_volatile() }
    }
}

impl std::fmt::Debug for SnapshotView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotView")
            .field("face_is_valid", &self.face_is_valid())
            .field("eye_following_valid", &self.is_eye_following_blendshapes_valid())
            .field("left_eye_is_valid", &self.left_eye_is_valid())
            .field("right_eye_is_valid", &self.right_eye_is_valid())
            .finish()
    }
}
