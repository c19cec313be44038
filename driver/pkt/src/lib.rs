//! 包缓冲与缓冲池
//!
//! 对应 WHD 的 whd_buffer_funcs_t / whd_buffer_api.c：控制通道从池中取一个
//! Packet 构造 IOCTL/IOVAR 请求，发送方向（TX）由通道释放，接收方向（RX）由
//! 调用方检视响应后释放。Rust 侧释放即 drop，`release(buffer, direction)`
//! 不再单列。

#![no_std]

extern crate alloc;

mod packet;

pub use packet::{Buffer, BufferDir, BufferPool, HeapBufferPool, Packet};
