//! Optional zstd compression stage.
//!
//! Compressed payloads carry a fixed marker tag so that traffic produced with
//! compression disabled can share a key with traffic that has it enabled. The
//! decompression side is deliberately tolerant: anything without the marker,
//! or any frame zstd refuses to decode, is passed through unchanged and left
//! for the codec stage to reject.

use std::borrow::Cow;
use std::cell::RefCell;

thread_local! {
    static ZSTD_CCTX: RefCell<zstd_safe::CCtx<'static>> = RefCell::new(zstd_safe::CCtx::create());
    static ZSTD_DCTX: RefCell<zstd_safe::DCtx<'static>> = RefCell::new(zstd_safe::DCtx::create());
}

/// Marker tag prepended to compressed payloads.
pub const COMPRESS_MARKER: &[u8] = b"~!~zstd~!~";

/// Fixed compression level. Cookie payloads are small, so this favors latency
/// over ratio.
const COMPRESS_LEVEL: i32 = 3;

/// Upper bound on the decompressed size of a single cookie payload. Frames
/// claiming more than this are treated as corrupt.
pub const MAX_PAYLOAD_SIZE: usize = 1 << 20; // 1 MiB

/// Compress a payload, prefixing it with [`COMPRESS_MARKER`].
///
/// If zstd fails for any reason the payload is returned uncompressed and
/// unmarked, which the tolerant [`decompress`] side accepts as-is.
pub fn compress(raw: &[u8]) -> Vec<u8> {
    let mut buf = Vec::from(COMPRESS_MARKER);
    match zstd_compress(raw, &mut buf) {
        Ok(()) => buf,
        Err(_) => raw.to_vec(),
    }
}

/// Reverse [`compress`], tolerating uncompressed input.
///
/// Input without the marker tag, or with a frame that fails to decode, is
/// returned unchanged rather than being reported as an error.
pub fn decompress(data: &[u8]) -> Cow<'_, [u8]> {
    let Some(body) = data.strip_prefix(COMPRESS_MARKER) else {
        return Cow::Borrowed(data);
    };
    match zstd_decompress(body) {
        Some(raw) => Cow::Owned(raw),
        None => Cow::Borrowed(data),
    }
}

fn zstd_compress(input: &[u8], output: &mut Vec<u8>) -> Result<(), zstd_safe::ErrorCode> {
    use zstd_safe::*;
    ZSTD_CCTX.with_borrow_mut(|ctx| {
        // Single frame, with the decompressed size recorded in the header so
        // the decode side can bound its allocation.
        ctx.reset(ResetDirective::SessionAndParameters)?;
        ctx.set_parameter(CParameter::CompressionLevel(COMPRESS_LEVEL))?;
        ctx.set_parameter(CParameter::ChecksumFlag(false))?;
        ctx.set_parameter(CParameter::ContentSizeFlag(true))?;
        ctx.set_pledged_src_size(Some(input.len() as u64))?;

        output.reserve(compress_bound(input.len()));
        let out_buffer = output.spare_capacity_mut();

        // SAFETY: zstd fills the spare capacity and reports how much it used;
        // the vec length is only raised by that amount.
        unsafe {
            let out_buffer = core::slice::from_raw_parts_mut(
                out_buffer.as_mut_ptr() as *mut u8,
                out_buffer.len(),
            );
            let used_len = ctx.compress2(out_buffer, input)?;
            output.set_len(output.len() + used_len);
        }
        Ok(())
    })
}

fn zstd_decompress(input: &[u8]) -> Option<Vec<u8>> {
    use zstd_safe::*;

    // Reject frames that don't declare their content size, or declare one
    // past the payload cap, before allocating anything.
    let out_size = get_frame_content_size(input).ok()?? as usize;
    if out_size > MAX_PAYLOAD_SIZE {
        return None;
    }
    let mut output: Vec<u8> = Vec::with_capacity(out_size);

    ZSTD_DCTX.with_borrow_mut(|dctx| {
        dctx.reset(ResetDirective::SessionAndParameters).ok()?;
        dctx.set_parameter(DParameter::WindowLogMax(21)).ok()?;

        // SAFETY: zstd fills the spare capacity and reports how much it used;
        // the vec length is only raised by that amount.
        let out_buffer = output.spare_capacity_mut();
        let used_len = unsafe {
            let out_buffer = core::slice::from_raw_parts_mut(
                out_buffer.as_mut_ptr() as *mut u8,
                out_buffer.len(),
            );
            let used_len = dctx.decompress(out_buffer, input).ok()?;
            output.set_len(used_len);
            used_len
        };
        if used_len != out_size {
            return None;
        }
        Some(())
    })?;
    Some(output)
}
