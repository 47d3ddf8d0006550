use keyfob_device::{Curve, KeySlot, Session};
use keyfob_transport_hid::{DeviceManager, HidConfig, HidError, HidTransport};

/// List all visible HID devices
pub fn list_devices(manager: &DeviceManager) {
    let candidates = manager.list_devices();

    if candidates.is_empty() {
        println!("No HID devices found!");
        return;
    }

    println!("Visible HID devices:");
    for (i, candidate) in candidates.iter().enumerate() {
        println!("{}. {}", i + 1, candidate);
    }
}

/// Find the first compatible signing device
pub fn find_device(
    manager: &DeviceManager,
    config: HidConfig,
) -> Result<HidTransport, Box<dyn std::error::Error>> {
    match manager.find_device_with_config(config) {
        Ok(transport) => Ok(transport),
        Err(HidError::NoDeviceFound { candidates }) => {
            if candidates.is_empty() {
                Err("No signing device found and no HID devices visible".into())
            } else {
                println!("No signing device found. Visible devices:");
                for candidate in &candidates {
                    println!("  {candidate}");
                }
                Err("No signing device found".into())
            }
        }
        Err(e) => Err(e.into()),
    }
}

/// Query and display the firmware version
pub fn version_command(
    session: &mut Session<HidTransport>,
) -> Result<(), Box<dyn std::error::Error>> {
    let version = session.version()?;
    println!("Firmware: {version}");
    Ok(())
}

/// Echo a message off the device
pub fn echo_command(
    session: &mut Session<HidTransport>,
    message: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let echoed = session.echo(message.as_bytes())?;
    println!("Echoed: {}", String::from_utf8_lossy(&echoed));
    if echoed.len() < message.len() {
        println!("(truncated to the device's {}-byte buffer)", echoed.len());
    }
    Ok(())
}

/// Hash data on the device
pub fn hash_command(
    session: &mut Session<HidTransport>,
    data: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = hex::decode(data)?;
    let digest = session.hash(&data)?;
    println!("SHA-256: {}", hex::encode(digest));
    Ok(())
}

/// Retrieve and display a public key
pub fn public_key_command(
    session: &mut Session<HidTransport>,
    curve: Curve,
    slot: &KeySlot,
) -> Result<(), Box<dyn std::error::Error>> {
    let key = session.public_key(curve, slot)?;
    println!("Public key ({curve}): {key}");
    Ok(())
}

/// Sign data and verify the signature against the slot's public key
pub fn sign_command(
    session: &mut Session<HidTransport>,
    data: &str,
    curve: Curve,
    slot: &KeySlot,
    no_verify: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let message = hex::decode(data)?;

    let key = session.public_key(curve, slot)?;
    println!("Approve the request on the device...");
    let signature = session.sign(curve, slot, &message)?;
    println!("Signature ({curve}): {signature}");

    if no_verify {
        return Ok(());
    }

    let valid = match curve {
        Curve::Secp256k1 => {
            keyfob_verify::secp256k1::verify(&message, key.as_bytes(), signature.as_bytes())?
        }
        Curve::Ed25519 => {
            keyfob_verify::ed25519::verify(&message, key.as_bytes(), signature.as_bytes())?
        }
    };
    if !valid {
        return Err("Signature did not verify against the device's public key".into());
    }
    println!("Signature verified against public key {key}");
    Ok(())
}
