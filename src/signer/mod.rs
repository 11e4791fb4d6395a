//! Local block-signing: key management and POA header sealing.

pub mod dev;
pub mod errors;
pub mod manager;
pub mod sealer;

pub use errors::SignerError;
pub use manager::SignerManager;
pub use sealer::{bytes_to_signature, signature_to_bytes, BlockSealer};

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_signer::Signer;

    #[tokio::test]
    async fn dev_signers_are_loaded_and_usable() {
        let manager = dev::setup_dev_signers().await;
        let addresses = manager.signer_addresses().await;
        assert_eq!(addresses.len(), 3);
        assert_eq!(addresses[0], dev::first_dev_signer().address());
    }

    #[tokio::test]
    async fn add_signer_from_hex_round_trips_through_sign_and_verify() {
        let manager = SignerManager::new();
        let address = manager
            .add_signer_from_hex(dev::DEV_PRIVATE_KEYS[0])
            .await
            .unwrap();

        let header = alloy_consensus::Header::default();
        let sealer = BlockSealer::new(std::sync::Arc::new(manager));
        let sealed = sealer.seal_header(header, &address).await.unwrap();

        let recovered = BlockSealer::verify_signature(&sealed).unwrap();
        assert_eq!(recovered, address);
    }

    #[tokio::test]
    async fn has_signer_reflects_registration() {
        let manager = SignerManager::new();
        assert!(!manager.has_signer(&dev::first_dev_signer().address()).await);

        let address = manager
            .add_signer_from_hex(dev::DEV_PRIVATE_KEYS[0])
            .await
            .unwrap();
        assert!(manager.has_signer(&address).await);

        assert!(manager.remove_signer(&address).await);
        assert!(!manager.has_signer(&address).await);
    }
}
