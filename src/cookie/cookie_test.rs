use super::*;

fn addr(s: &str) -> SocketAddr {
    s.parse().unwrap()
}

#[test]
fn test_cookie_binds_address() -> Result<()> {
    let generator = CookieGenerator::new();

    let a = addr("192.0.2.1:4444");
    let b = addr("192.0.2.2:4444");
    let c = addr("192.0.2.1:4445");

    let cookie = generator.generate(&a)?;
    assert_eq!(cookie.len(), COOKIE_LENGTH);

    assert!(generator.verify(&a, &cookie));
    assert!(!generator.verify(&b, &cookie), "different host must fail");
    assert!(!generator.verify(&c, &cookie), "different port must fail");
    assert!(!generator.verify(&a, &[]), "empty cookie must fail");

    Ok(())
}

#[test]
fn test_cookie_rotation_invalidates() -> Result<()> {
    let mut generator = CookieGenerator::new();
    let a = addr("[2001:db8::1]:5684");

    let cookie = generator.generate(&a)?;
    assert!(generator.verify(&a, &cookie));

    generator.rotate();
    assert!(!generator.verify(&a, &cookie));

    Ok(())
}

#[test]
fn test_cookie_is_deterministic_per_secret() -> Result<()> {
    let generator = CookieGenerator::new();
    let a = addr("198.51.100.7:1234");

    assert_eq!(generator.generate(&a)?, generator.generate(&a)?);

    Ok(())
}
