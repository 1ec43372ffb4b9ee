//! Backend status codes.
//!
//! Failures are reported with the numeric codes of the OpenCL
//! status table so diagnostics read the same across backends.
//! [`DeviceError`](crate::DeviceError) prints the symbolic name next
//! to the number.

pub const SUCCESS: i32 = 0;
pub const DEVICE_NOT_FOUND: i32 = -1;
pub const OUT_OF_RESOURCES: i32 = -5;
pub const OUT_OF_HOST_MEMORY: i32 = -6;
pub const BUILD_PROGRAM_FAILURE: i32 = -11;
pub const INVALID_VALUE: i32 = -30;
pub const INVALID_MEM_OBJECT: i32 = -38;
pub const INVALID_KERNEL_NAME: i32 = -46;
pub const INVALID_KERNEL: i32 = -48;
pub const INVALID_ARG_INDEX: i32 = -49;
pub const INVALID_ARG_SIZE: i32 = -51;
pub const INVALID_KERNEL_ARGS: i32 = -52;
pub const INVALID_WORK_GROUP_SIZE: i32 = -54;
pub const INVALID_BUFFER_SIZE: i32 = -61;
pub const INVALID_GLOBAL_WORK_SIZE: i32 = -63;

/// Symbolic name of a status code.
pub fn name(code: i32) -> &'static str {
    match code {
        SUCCESS => "SUCCESS",
        DEVICE_NOT_FOUND => "DEVICE_NOT_FOUND",
        OUT_OF_RESOURCES => "OUT_OF_RESOURCES",
        OUT_OF_HOST_MEMORY => "OUT_OF_HOST_MEMORY",
        BUILD_PROGRAM_FAILURE => "BUILD_PROGRAM_FAILURE",
        INVALID_VALUE => "INVALID_VALUE",
        INVALID_MEM_OBJECT => "INVALID_MEM_OBJECT",
        INVALID_KERNEL_NAME => "INVALID_KERNEL_NAME",
        INVALID_KERNEL => "INVALID_KERNEL",
        INVALID_ARG_INDEX => "INVALID_ARG_INDEX",
        INVALID_ARG_SIZE => "INVALID_ARG_SIZE",
        INVALID_KERNEL_ARGS => "INVALID_KERNEL_ARGS",
        INVALID_WORK_GROUP_SIZE => "INVALID_WORK_GROUP_SIZE",
        INVALID_BUFFER_SIZE => "INVALID_BUFFER_SIZE",
        INVALID_GLOBAL_WORK_SIZE => "INVALID_GLOBAL_WORK_SIZE",
        _ => "UNKNOWN",
    }
}
