use log::debug;
use zeroize::Zeroizing;

use crate::async_result::AsyncResult;
use crate::composed::message::{Edata, Message};
use crate::errors::Error;
use crate::packet::SymKeyEncryptedSessionKey;
use crate::registry::AlgorithmRegistry;

/// Tries each session key in turn until one decrypts `edata` into a message.
///
/// Holds its own copy of the registry, later attempts only start once the
/// previous one settled.
pub(crate) fn decrypt_with_skesks(
    registry: AlgorithmRegistry,
    mut skesks: std::vec::IntoIter<SymKeyEncryptedSessionKey>,
    passphrase: Zeroizing<Vec<u8>>,
    edata: Edata,
) -> AsyncResult<Message> {
    let Some(skesk) = skesks.next() else {
        return AsyncResult::err(Error::WrongPassphrase);
    };

    let attempt = {
        let registry = registry.clone();
        let edata = edata.clone();
        skesk
            .decrypt(&registry, &passphrase)
            .add_async_callback(move |session_key| edata.decrypt(&registry, &session_key))
    };

    let result = AsyncResult::new();
    let target = result.clone();
    attempt.on_settled(move |outcome| match outcome {
        Ok(message) => {
            target.fulfil(message);
        }
        Err(err) if !skesks.as_slice().is_empty() => {
            debug!("session key did not decrypt the message: {}", err);
            decrypt_with_skesks(registry, skesks, passphrase, edata).on_settled(
                move |outcome| match outcome {
                    Ok(message) => {
                        target.fulfil(message);
                    }
                    Err(err) => {
                        target.reject(err);
                    }
                },
            );
        }
        Err(err) => {
            target.reject(err);
        }
    });

    result
}
