//! End-to-end tests for the incremental segment stream machine: synthetic
//! streams are built segment by segment and fed whole, in single bytes, and
//! in awkward splits.

mod common;

use common::{
    EXPECTED, GENERIC_FIXTURES, HEIGHT, WIDTH, file_header, generic_region_body, page_info_body,
    push_segment_header, push_u32,
};
use jbig2_stream::{DecoderOptions, ErrorKind, Jbig2Decoder, decode};

/// Segment bodies for the standard single-page fixture: template 0,
/// arithmetic coding, nominal adaptive pixels.
fn region_body() -> Vec<u8> {
    let fixture = &GENERIC_FIXTURES[0];
    generic_region_body(WIDTH, HEIGHT, 0, 0, 0x00, fixture.at, fixture.payload)
}

/// One page: page information, an immediate generic region, end of page,
/// end of file.
fn basic_segments() -> Vec<u8> {
    let mut out = Vec::new();

    let page_info = page_info_body(WIDTH, HEIGHT, 0x40, 0x0000);
    push_segment_header(&mut out, 0, 48, 1, page_info.len() as u32);
    out.extend_from_slice(&page_info);

    let region = region_body();
    push_segment_header(&mut out, 1, 38, 1, region.len() as u32);
    out.extend_from_slice(&region);

    push_segment_header(&mut out, 2, 49, 1, 0);
    push_segment_header(&mut out, 3, 51, 0, 0);

    out
}

fn basic_stream() -> Vec<u8> {
    let mut out = file_header(true, 1);
    out.extend_from_slice(&basic_segments());
    out
}

#[test]
fn decodes_a_standalone_stream() {
    let page = decode(&basic_stream()).unwrap();

    assert_eq!(page.width(), WIDTH);
    assert_eq!(page.height(), HEIGHT);
    assert_eq!(page.data(), EXPECTED);
}

#[test]
fn one_byte_chunks_decode_identically() {
    let stream = basic_stream();

    let mut decoder = Jbig2Decoder::new();
    for byte in &stream {
        decoder.feed(std::slice::from_ref(byte)).unwrap();
    }
    decoder.finish().unwrap();

    let page = decoder.take_page().unwrap();
    assert_eq!(page.data(), EXPECTED);
}

#[test]
fn embedded_streams_have_no_file_header() {
    let mut decoder = Jbig2Decoder::embedded();
    decoder.feed(&basic_segments()).unwrap();
    decoder.finish().unwrap();

    let page = decoder.take_page().unwrap();
    assert_eq!(page.data(), EXPECTED);
}

#[test]
fn unknown_length_region_is_recovered() {
    let mut stream = file_header(true, 1);

    let page_info = page_info_body(WIDTH, HEIGHT, 0x40, 0x0000);
    push_segment_header(&mut stream, 0, 48, 1, page_info.len() as u32);
    stream.extend_from_slice(&page_info);

    // The region body with the unknown-length sentinel: the real length is
    // discovered from the 0xFF 0xAC terminator plus the row count field.
    let mut region = region_body();
    push_u32(&mut region, HEIGHT);
    push_segment_header(&mut stream, 1, 38, 1, 0xFFFF_FFFF);
    stream.extend_from_slice(&region);

    push_segment_header(&mut stream, 2, 49, 1, 0);
    push_segment_header(&mut stream, 3, 51, 0, 0);

    // Whole-buffer feed.
    let page = decode(&stream).unwrap();
    assert_eq!(page.data(), EXPECTED);

    // Byte-at-a-time feed forces the scan to wait for the marker.
    let mut decoder = Jbig2Decoder::new();
    for byte in &stream {
        decoder.feed(std::slice::from_ref(byte)).unwrap();
    }
    decoder.finish().unwrap();
    assert_eq!(decoder.take_page().unwrap().data(), EXPECTED);
}

#[test]
fn random_access_organization() {
    let mut stream = file_header(false, 1);

    let page_info = page_info_body(WIDTH, HEIGHT, 0x40, 0x0000);
    let region = region_body();

    // All headers first, then the bodies in the same order.
    push_segment_header(&mut stream, 0, 48, 1, page_info.len() as u32);
    push_segment_header(&mut stream, 1, 38, 1, region.len() as u32);
    push_segment_header(&mut stream, 2, 49, 1, 0);
    push_segment_header(&mut stream, 3, 51, 0, 0);
    stream.extend_from_slice(&page_info);
    stream.extend_from_slice(&region);

    let page = decode(&stream).unwrap();
    assert_eq!(page.data(), EXPECTED);
}

#[test]
fn striped_page_with_unknown_height() {
    let mut stream = file_header(true, 1);

    // Height unknown, striped, maximum stripe size 16.
    let page_info = page_info_body(WIDTH, 0xFFFF_FFFF, 0x40, 0x8010);
    push_segment_header(&mut stream, 0, 48, 1, page_info.len() as u32);
    stream.extend_from_slice(&page_info);

    let region = region_body();
    push_segment_header(&mut stream, 1, 38, 1, region.len() as u32);
    stream.extend_from_slice(&region);

    // End of stripe: the last row of the stripe is row 15.
    push_segment_header(&mut stream, 2, 50, 1, 4);
    push_u32(&mut stream, HEIGHT - 1);

    push_segment_header(&mut stream, 3, 49, 1, 0);
    push_segment_header(&mut stream, 4, 51, 0, 0);

    let page = decode(&stream).unwrap();
    assert_eq!(page.height(), HEIGHT);
    assert_eq!(page.data(), EXPECTED);
}

#[test]
fn multiple_pages_come_out_in_order() {
    let mut stream = file_header(true, 2);

    let page_info = page_info_body(WIDTH, HEIGHT, 0x40, 0x0000);
    let region = region_body();

    let mut number = 0;
    for page in 1..=2_u8 {
        push_segment_header(&mut stream, number, 48, page, page_info.len() as u32);
        stream.extend_from_slice(&page_info);
        push_segment_header(&mut stream, number + 1, 38, page, region.len() as u32);
        stream.extend_from_slice(&region);
        push_segment_header(&mut stream, number + 2, 49, page, 0);
        number += 3;
    }

    let mut decoder = Jbig2Decoder::new();
    decoder.feed(&stream).unwrap();
    decoder.finish().unwrap();

    let first = decoder.take_page().unwrap();
    let second = decoder.take_page().unwrap();
    assert_eq!(first.data(), EXPECTED);
    assert_eq!(second.data(), EXPECTED);
    assert!(decoder.take_page().is_none());
}

#[test]
fn pages_complete_only_at_end_of_page() {
    let mut stream = file_header(true, 1);

    let page_info = page_info_body(WIDTH, HEIGHT, 0x40, 0x0000);
    push_segment_header(&mut stream, 0, 48, 1, page_info.len() as u32);
    stream.extend_from_slice(&page_info);

    let region = region_body();
    push_segment_header(&mut stream, 1, 38, 1, region.len() as u32);
    stream.extend_from_slice(&region);

    let mut decoder = Jbig2Decoder::new();
    decoder.feed(&stream).unwrap();

    // No end-of-page yet, so nothing to take.
    assert!(decoder.take_page().is_none());

    // End of input forces completion.
    decoder.finish().unwrap();
    assert_eq!(decoder.take_page().unwrap().data(), EXPECTED);
}

#[test]
fn unsupported_and_unknown_segments_are_skipped() {
    let mut stream = file_header(true, 1);

    let page_info = page_info_body(WIDTH, HEIGHT, 0x40, 0x0000);
    push_segment_header(&mut stream, 0, 48, 1, page_info.len() as u32);
    stream.extend_from_slice(&page_info);

    // A symbol dictionary and a reserved segment type, both skipped whole.
    push_segment_header(&mut stream, 1, 0, 1, 5);
    stream.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF, 0x00]);
    push_segment_header(&mut stream, 2, 33, 1, 3);
    stream.extend_from_slice(&[0x01, 0x02, 0x03]);

    let region = region_body();
    push_segment_header(&mut stream, 3, 38, 1, region.len() as u32);
    stream.extend_from_slice(&region);

    push_segment_header(&mut stream, 4, 49, 1, 0);
    push_segment_header(&mut stream, 5, 51, 0, 0);

    let page = decode(&stream).unwrap();
    assert_eq!(page.data(), EXPECTED);
}

#[test]
fn intermediate_regions_store_their_result() {
    let mut stream = file_header(true, 1);

    let page_info = page_info_body(WIDTH, HEIGHT, 0x40, 0x0000);
    push_segment_header(&mut stream, 0, 48, 1, page_info.len() as u32);
    stream.extend_from_slice(&page_info);

    let region = region_body();
    push_segment_header(&mut stream, 1, 36, 1, region.len() as u32);
    stream.extend_from_slice(&region);

    push_segment_header(&mut stream, 2, 49, 1, 0);

    let mut decoder = Jbig2Decoder::new();
    decoder.feed(&stream).unwrap();
    decoder.finish().unwrap();

    let result = decoder.intermediate_result(1).unwrap();
    assert_eq!(result.data(), EXPECTED);

    // The intermediate region was not composited onto the page.
    let page = decoder.take_page().unwrap();
    assert!(page.data().iter().all(|&b| b == 0));
}

#[test]
fn trailing_bytes_after_end_of_file_are_ignored() {
    let mut stream = basic_stream();
    stream.extend_from_slice(&[0xAA; 64]);

    let mut decoder = Jbig2Decoder::new();
    decoder.feed(&stream).unwrap();
    decoder.feed(&[0xBB; 32]).unwrap();
    decoder.finish().unwrap();

    assert_eq!(decoder.take_page().unwrap().data(), EXPECTED);
}

#[test]
fn bad_magic_is_fatal() {
    let mut stream = basic_stream();
    stream[0] = 0x00;

    let mut decoder = Jbig2Decoder::new();
    assert!(decoder.feed(&stream).is_err());
}

#[test]
fn colour_region_flag_is_rejected() {
    let mut stream = basic_stream();
    stream[8] |= 0x08;

    let mut decoder = Jbig2Decoder::new();
    let err = decoder.feed(&stream).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Unsupported(_)));
}

#[test]
fn truncation_is_reported_but_earlier_pages_survive() {
    let mut stream = basic_stream();

    // A second page whose region body is cut off mid-way.
    let page_info = page_info_body(WIDTH, HEIGHT, 0x40, 0x0000);
    // Strip the end-of-file segment so parsing continues.
    stream.truncate(stream.len() - 11);
    push_segment_header(&mut stream, 4, 48, 2, page_info.len() as u32);
    stream.extend_from_slice(&page_info);

    let region = region_body();
    push_segment_header(&mut stream, 5, 38, 2, region.len() as u32);
    stream.extend_from_slice(&region[..region.len() / 2]);

    let mut decoder = Jbig2Decoder::new();
    decoder.feed(&stream).unwrap();

    let err = decoder.finish().unwrap_err();
    assert_eq!(err.segment, Some(5));

    // Page 1 completed before the truncation and is still retrievable.
    assert_eq!(decoder.take_page().unwrap().data(), EXPECTED);
}

#[test]
fn allocation_limit_aborts_the_stream() {
    let options = DecoderOptions {
        max_image_bytes: 8,
    };

    let mut decoder = Jbig2Decoder::with_options(options);
    let err = decoder.feed(&basic_stream()).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Limit(_)));
}

#[test]
fn region_without_page_information_is_fatal() {
    let mut stream = file_header(true, 1);
    let region = region_body();
    push_segment_header(&mut stream, 0, 38, 1, region.len() as u32);
    stream.extend_from_slice(&region);

    let mut decoder = Jbig2Decoder::new();
    assert!(decoder.feed(&stream).is_err());
}
