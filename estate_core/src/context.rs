// Wallet context
// Owns the session channel, the session store and both wallet backends, and
// resolves which backend serves a request.

use crate::error::CoreError;
use crate::file_service::FileService;
use crate::injected::{InjectedProvider, InjectedWallet};
use crate::models::{AccountId, WalletKind};
use crate::registration::{PropertyForm, PropertyRegistrar, RegistrationStatus};
use crate::remote::{RemoteWallet, SessionConnector};
use crate::session::{SessionStore, SessionSync, WalletSession};
use crate::settings::Settings;
use crate::wallet::{WalletInterface, WalletResult};
use log::info;
use std::rc::Rc;

pub struct WalletContext {
    sync: SessionSync,
    store: SessionStore,
    injected: Option<InjectedWallet>,
    remote: Option<RemoteWallet>,
    registrar: PropertyRegistrar,
}

impl WalletContext {
    /// Either backend may be absent, e.g. no browser extension or no
    /// WalletConnect project configured.
    pub fn new(
        settings: &Settings,
        provider: Option<Rc<dyn InjectedProvider>>,
        connector: Option<Rc<dyn SessionConnector>>,
    ) -> Result<Self, CoreError> {
        settings.validate()?;
        let sync = SessionSync::new();
        let store = SessionStore::bind(&sync)?;
        let injected = provider.map(|p| {
            InjectedWallet::new(p, settings.network.clone(), settings.gas_limits, sync.clone())
        });
        let remote = connector.map(|c| RemoteWallet::new(c, sync.clone()));
        let registrar = PropertyRegistrar::new(settings.registry_contract_id()?, settings.gas_limits.register_property);
        Ok(Self { sync, store, injected, remote, registrar })
    }

    pub fn sync(&self) -> &SessionSync {
        &self.sync
    }

    pub fn session(&self) -> WalletSession {
        self.store.snapshot()
    }

    pub fn account(&self) -> Option<AccountId> {
        self.store.account()
    }

    pub fn injected(&self) -> Option<&InjectedWallet> {
        self.injected.as_ref()
    }

    pub fn remote(&self) -> Option<&RemoteWallet> {
        self.remote.as_ref()
    }

    /// Restore sessions the backends already hold.
    pub async fn restore(&self) -> WalletResult<Option<AccountId>> {
        if let Some(injected) = &self.injected {
            injected.init().await?;
        }
        if let Some(remote) = &self.remote {
            remote.initialize().await?;
        }
        Ok(self.account())
    }

    pub async fn connect(&self, kind: WalletKind) -> WalletResult<Option<AccountId>> {
        if let Some(active) = self.store.active_backend() {
            if active != kind {
                return Err(CoreError::Validation(format!(
                    "Disconnect {} before connecting {}",
                    active, kind
                )));
            }
        }
        match kind {
            WalletKind::Injected => {
                let wallet = self.injected.as_ref().ok_or(CoreError::ProviderNotInstalled)?;
                wallet.listen()?;
                Ok(wallet.connect().await)
            }
            WalletKind::Remote => {
                let wallet = self
                    .remote
                    .as_ref()
                    .ok_or_else(|| CoreError::Config("WalletConnect is not configured".to_string()))?;
                Ok(wallet.connect().await)
            }
        }
    }

    /// Backend owning the connected session.
    pub fn active_wallet(&self) -> Option<&dyn WalletInterface> {
        match self.store.active_backend()? {
            WalletKind::Injected => self.injected.as_ref().map(|w| w as &dyn WalletInterface),
            WalletKind::Remote => self.remote.as_ref().map(|w| w as &dyn WalletInterface),
        }
    }

    pub async fn disconnect(&self) -> WalletResult<()> {
        match self.active_wallet() {
            Some(wallet) => {
                info!("Disconnecting {}", wallet.kind());
                wallet.disconnect().await
            }
            None => Ok(()),
        }
    }

    pub async fn register_property<S>(
        &self,
        files: &dyn FileService,
        form: &PropertyForm,
        image_contents: &str,
        on_status: S,
    ) -> RegistrationStatus
    where
        S: FnMut(&RegistrationStatus),
    {
        self.registrar
            .register(self.account(), self.active_wallet(), files, form, image_contents, on_status)
            .await
    }
}
