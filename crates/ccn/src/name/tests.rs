use std::time::{Duration, UNIX_EPOCH};

use super::*;

#[test]
fn parse_simple() -> anyhow::Result<()> {
    let name = Name::parse("/ndn/keys")?;
    assert_eq!(name.len(), 2);
    assert_eq!(name.components()[0].as_bytes(), b"ndn");
    assert_eq!(name.components()[1].as_bytes(), b"keys");
    assert_eq!(name, Name::new().append("ndn").append("keys"));
    Ok(())
}

#[test]
fn scheme_and_empty_segments() -> anyhow::Result<()> {
    let a = Name::parse("ccnx:/ndn//keys/")?;
    let b = Name::parse("CCNX:/ndn/keys")?;
    assert_eq!(a, b);
    assert!(Name::parse("/")?.is_empty());
    Ok(())
}

#[test]
fn percent_escapes_decode() -> anyhow::Result<()> {
    let name = Name::parse("/%C1.M.S.localhost/%C1.S.cs")?;
    assert_eq!(name.components()[0].as_bytes(), b"\xC1.M.S.localhost");
    assert_eq!(name.components()[1].as_bytes(), b"\xC1.S.cs");
    Ok(())
}

#[test]
fn dot_components() -> anyhow::Result<()> {
    let name = Name::parse("/a/.../b/....")?;
    assert_eq!(name.components()[1].as_bytes(), b"");
    assert_eq!(name.components()[3].as_bytes(), b".");
    assert_eq!(Name::parse("/a/./b"), Err(NameError::Relative(".".into())));
    assert_eq!(Name::parse("/a/.."), Err(NameError::Relative("..".into())));
    Ok(())
}

#[test]
fn malformed_names() {
    assert!(matches!(Name::parse(""), Err(NameError::Syntax(_))));
    assert!(matches!(Name::parse("ndn/keys"), Err(NameError::Syntax(_))));
    assert!(matches!(Name::parse("ccnx:"), Err(NameError::Syntax(_))));
    assert!(matches!(Name::parse("/a%2"), Err(NameError::Escape(_))));
    assert!(matches!(Name::parse("/a%zz"), Err(NameError::Escape(_))));
    assert_eq!(Name::parse("/a?b"), Err(NameError::Reserved('?')));
    assert_eq!(Name::parse("/a#b"), Err(NameError::Reserved('#')));
    assert_eq!(Name::parse("/a b"), Err(NameError::Reserved(' ')));
}

#[test]
fn display_escapes() {
    let name = Name::new()
        .append("ndn")
        .append(&b"\xC1.S.cs"[..])
        .append("")
        .append("..")
        .append("a+b=");
    insta::assert_snapshot!(name.to_string(), @"/ndn/%C1.S.cs/.../...../a%2Bb%3D");
    insta::assert_snapshot!(Name::new().to_string(), @"/");
}

#[test]
fn display_roundtrip() -> anyhow::Result<()> {
    let name = Name::new()
        .append("ndn")
        .append(vec![0u8, 1, 2, 255])
        .append("...")
        .append("")
        .append("with space/and slash")
        .append_segment(0);
    assert_eq!(Name::parse(&name.to_string())?, name);
    Ok(())
}

#[test]
fn join_and_prefix() -> anyhow::Result<()> {
    let prefix = Name::parse("/ndn/keys")?;
    let full = prefix.join(&Name::parse("/info/abc")?);
    assert_eq!(full.to_string(), "/ndn/keys/info/abc");
    assert!(prefix.is_prefix_of(&full));
    assert!(prefix.is_prefix_of(&prefix));
    assert!(!full.is_prefix_of(&prefix));
    assert!(Name::new().is_prefix_of(&prefix));
    // the original is untouched
    assert_eq!(prefix.len(), 2);
    Ok(())
}

#[test]
fn markers() {
    assert_eq!(Component::segment(0).as_bytes(), &[0x00]);
    assert_eq!(Component::segment(258).as_bytes(), &[0x00, 0x01, 0x02]);
    assert_eq!(Component::segment(258).as_segment(), Some(258));
    assert_eq!(Component::segment(0).as_segment(), Some(0));
    assert_eq!(Component::from("x").as_segment(), None);

    let v = Component::version(UNIX_EPOCH + Duration::from_secs(1));
    assert_eq!(v.as_bytes(), &[0xFD, 0x10, 0x00]);
    assert!(v.is_version());
    assert!(!Component::segment(3).is_version());
}

#[test]
fn ccnb_roundtrip() -> anyhow::Result<()> {
    let name = Name::parse("/ndn/.../keys")?;
    let bytes = name.to_ccnb();
    assert_eq!(
        bytes,
        vec![
            0xF2, 0xFA, 0x9D, b'n', b'd', b'n', 0x00, 0xFA, 0x00, 0xFA, 0xA5, b'k', b'e', b'y',
            b's', 0x00, 0x00
        ]
    );
    let (element, _) = Element::decode(&bytes)?;
    assert_eq!(Name::from_element(&element)?, name);
    Ok(())
}
