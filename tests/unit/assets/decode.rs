use std::io::Cursor;

use super::*;

#[test]
fn decode_image_png_dimensions_and_premul() {
    let img = image::RgbaImage::from_raw(1, 1, vec![100u8, 50u8, 200u8, 128u8]).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();

    let r = decode_image(&buf).unwrap();
    assert_eq!((r.width, r.height), (1, 1));
    assert_eq!(
        r.data,
        vec![
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128u8
        ]
    );
}

#[test]
fn decode_image_rejects_garbage() {
    assert!(decode_image(b"not a png").is_err());
}

#[test]
fn decode_wav_int16_mono() {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut buf = Cursor::new(Vec::new());
    {
        let mut w = hound::WavWriter::new(&mut buf, spec).unwrap();
        for v in [0i16, 16_384, -32_768, 32_767] {
            w.write_sample(v).unwrap();
        }
        w.finalize().unwrap();
    }
    let pcm = decode_wav(buf.get_ref()).unwrap();
    assert_eq!(pcm.sample_rate, 8_000);
    assert_eq!(pcm.channels, 1);
    assert_eq!(pcm.frames(), 4);
    assert_eq!(pcm.interleaved_f32[0], 0.0);
    assert!((pcm.interleaved_f32[1] - 0.5).abs() < 1e-6);
    assert_eq!(pcm.interleaved_f32[2], -1.0);
    assert!((pcm.duration_secs() - 0.0005).abs() < 1e-9);
}

#[test]
fn decode_wav_float_stereo() {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 48_000,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut buf = Cursor::new(Vec::new());
    {
        let mut w = hound::WavWriter::new(&mut buf, spec).unwrap();
        for v in [0.25f32, -0.25, 0.5, -0.5] {
            w.write_sample(v).unwrap();
        }
        w.finalize().unwrap();
    }
    let pcm = decode_wav(buf.get_ref()).unwrap();
    assert_eq!(pcm.channels, 2);
    assert_eq!(pcm.frames(), 2);
    assert_eq!(pcm.interleaved_f32, vec![0.25, -0.25, 0.5, -0.5]);
}

#[test]
fn decode_wav_rejects_garbage() {
    assert!(decode_wav(b"RIFFnope").is_err());
}
