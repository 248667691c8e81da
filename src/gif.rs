//! Animated-GIF detection by raw byte scan.
//!
//! Decoders in the `image` crate will happily hand back the first frame of
//! an animation, so the only way to know a GIF is animated without decoding
//! every frame is to walk the block structure ourselves and count Image
//! Descriptors. The walk is an index-based cursor over the byte slice with
//! tagged dispatch on the block introducer byte; malformed input never
//! errors, the scan just stops at the buffer end with the verdict so far.
//!
//! Layout refresher (GIF89a spec):
//!
//! ```text
//! 0..6    signature        "GIF87a" | "GIF89a"
//! 6..13   logical screen descriptor (packed flags at byte 10)
//! 13..    optional global color table, then blocks:
//!           0x2C  image descriptor (one per frame)
//!           0x21  extension (introducer + label + sub-blocks)
//!           0x3B  trailer
//! ```

/// Minimum bytes for the signature plus logical screen descriptor plus one
/// block introducer.
const MIN_GIF_LEN: usize = 14;

/// Fixed-size part of an image descriptor after the 0x2C introducer:
/// left, top, width, height (u16 each) plus the packed flags byte.
const IMAGE_DESCRIPTOR_LEN: usize = 9;

/// Returns true when `bytes` is a GIF containing more than one frame.
///
/// Non-GIF data, truncated streams, and single-frame GIFs all return false.
pub fn is_animated_gif(bytes: &[u8]) -> bool {
    if bytes.len() < MIN_GIF_LEN {
        return false;
    }
    if &bytes[..6] != b"GIF87a" && &bytes[..6] != b"GIF89a" {
        return false;
    }

    // Bit 7 of the packed byte announces a global color table whose size is
    // 3 * 2^(N+1), N being the low three bits.
    let packed = bytes[10];
    let global_table_len = color_table_len(packed);

    let mut pos = 13 + global_table_len;
    let mut frames = 0u32;

    while pos < bytes.len() {
        match bytes[pos] {
            0x3B => break, // trailer
            0x2C => {
                frames += 1;
                if frames > 1 {
                    return true;
                }
                if pos + IMAGE_DESCRIPTOR_LEN >= bytes.len() {
                    break;
                }
                let local_packed = bytes[pos + IMAGE_DESCRIPTOR_LEN];
                pos += 1 + IMAGE_DESCRIPTOR_LEN;
                pos += color_table_len(local_packed);
                if pos >= bytes.len() {
                    break;
                }
                pos += 1; // LZW minimum code size
                pos = skip_sub_blocks(bytes, pos);
            }
            0x21 => {
                // Extension: introducer + label, then the same sub-block
                // chain as image data.
                pos += 2;
                pos = skip_sub_blocks(bytes, pos);
            }
            // Unknown introducer; step over it rather than give up so a
            // slightly mangled stream still yields a frame count.
            _ => pos += 1,
        }
    }

    frames > 1
}

/// Color table length in bytes for a packed-flags byte, 0 when the
/// table-present bit is clear.
fn color_table_len(packed: u8) -> usize {
    if packed & 0x80 != 0 {
        3 * (1usize << ((packed & 0x07) + 1))
    } else {
        0
    }
}

/// Skip a chain of length-prefixed sub-blocks starting at `pos`, returning
/// the index just past the zero-length terminator (or the buffer end).
fn skip_sub_blocks(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() {
        let block_len = bytes[pos] as usize;
        pos += 1;
        if block_len == 0 {
            break;
        }
        pos += block_len;
    }
    pos
}
