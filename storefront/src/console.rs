//! Line-oriented command prompt.
//!
//! Each input line parses into a [`Command`]; a [`Session`] turns commands into
//! store actions and writes anything the views do not cover to the sink.

use crate::types::{
    ContactField, DeliveryField, ProductId, StorefrontAction, StorefrontState,
};
use crate::views::{BasketView, CatalogView, PreviewView, Sink};
use crate::StorefrontStore;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use storefront_api::CatalogApi;
use storefront_runtime::StoreError;
use thiserror::Error;
use tokio::sync::broadcast::error::TryRecvError;

/// Text printed by `help`
pub const HELP: &str = "\
Commands:
  catalog            list products
  reload             fetch the catalog again
  show <id|n>        open a product card
  detail <id|n>      fetch a product from the server
  add <id|n>         put a product in the basket
  remove <id|n>      take a product out of the basket
  toggle <id|n>      add or remove a product
  basket             show the basket
  clear              empty the basket
  checkout           start checkout
  pay <online|cash>  choose the payment method
  address <text>     set the delivery address
  email <text>       set the contact email
  phone <text>       set the contact phone
  submit             place the order
  help               show this help
  quit               leave";

/// A parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List the catalog
    Catalog,
    /// Fetch the catalog again
    Reload,
    /// Open a product card
    Show(ProductId),
    /// Fetch one product from the server
    Detail(ProductId),
    /// Put a product in the basket
    Add(ProductId),
    /// Take a product out of the basket
    Remove(ProductId),
    /// Add or remove a product
    Toggle(ProductId),
    /// Show the basket
    Basket,
    /// Empty the basket
    Clear,
    /// Start checkout
    Checkout,
    /// Choose the payment method
    Pay(String),
    /// Set the delivery address
    Address(String),
    /// Set the contact email
    Email(String),
    /// Set the contact phone
    Phone(String),
    /// Place the order
    Submit,
    /// Show help
    Help,
    /// Leave
    Quit,
}

/// Errors from parsing an input line
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    /// Blank line
    #[error("Empty command")]
    Empty,

    /// Unrecognized command word
    #[error("Unknown command: {0} (type help)")]
    Unknown(String),

    /// A required argument is missing
    #[error("Usage: {command} <{argument}>")]
    MissingArgument {
        /// Command word
        command: &'static str,
        /// Name of the missing argument
        argument: &'static str,
    },
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(word, rest)| (word, rest.trim()));

        let id = |command: &'static str| {
            if rest.is_empty() {
                Err(CommandError::MissingArgument {
                    command,
                    argument: "id",
                })
            } else {
                Ok(ProductId::new(rest))
            }
        };

        match word.to_lowercase().as_str() {
            "" => Err(CommandError::Empty),
            "catalog" | "ls" => Ok(Self::Catalog),
            "reload" => Ok(Self::Reload),
            "show" => id("show").map(Self::Show),
            "detail" => id("detail").map(Self::Detail),
            "add" => id("add").map(Self::Add),
            "remove" | "rm" => id("remove").map(Self::Remove),
            "toggle" => id("toggle").map(Self::Toggle),
            "basket" => Ok(Self::Basket),
            "clear" => Ok(Self::Clear),
            "checkout" => Ok(Self::Checkout),
            "pay" if rest.is_empty() => Err(CommandError::MissingArgument {
                command: "pay",
                argument: "online|cash",
            }),
            "pay" => Ok(Self::Pay(rest.to_string())),
            "address" => Ok(Self::Address(rest.to_string())),
            "email" => Ok(Self::Email(rest.to_string())),
            "phone" => Ok(Self::Phone(rest.to_string())),
            "submit" => Ok(Self::Submit),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            _ => Err(CommandError::Unknown(word.to_string())),
        }
    }
}

/// What the prompt loop should do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next line
    Continue,
    /// Stop reading
    Quit,
}

/// Executes commands against a store
pub struct Session {
    store: StorefrontStore,
    api: Arc<dyn CatalogApi>,
    sink: Arc<dyn Sink>,
    timeout: Duration,
}

impl Session {
    /// Creates a session over an already wired store
    #[must_use]
    pub fn new(store: StorefrontStore, api: Arc<dyn CatalogApi>, sink: Arc<dyn Sink>) -> Self {
        Self {
            store,
            api,
            sink,
            timeout: Duration::from_secs(15),
        }
    }

    /// How long to wait for network effects before giving up on them
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run one command
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the store stops
    /// accepting actions.
    pub async fn execute(&self, command: Command) -> Result<Flow, StoreError> {
        tracing::debug!(?command, "Executing command");

        match command {
            Command::Catalog => {
                let catalog = self.store.state(|s| s.catalog.clone()).await;
                self.sink.write(&CatalogView::render_catalog(&catalog));
            },
            Command::Reload => self.dispatch_and_wait(StorefrontAction::RequestCatalog).await?,
            Command::Show(id) => {
                let id = self.resolve(id).await;
                self.dispatch(StorefrontAction::SelectPreview { id }).await?;
            },
            Command::Detail(id) => {
                let id = self.resolve(id).await;
                self.detail(&id).await;
            },
            Command::Add(id) => {
                let id = self.resolve(id).await;
                self.dispatch(StorefrontAction::AddToBasket { id }).await?;
            },
            Command::Remove(id) => {
                let id = self.resolve(id).await;
                self.dispatch(StorefrontAction::RemoveFromBasket { id }).await?;
            },
            Command::Toggle(id) => {
                let id = self.resolve(id).await;
                self.dispatch(StorefrontAction::ToggleBasket { id }).await?;
            },
            Command::Basket => {
                let text = self
                    .store
                    .state(|s| BasketView::render_basket(&s.basket, s.basket_total(), s.checkout_enabled()))
                    .await;
                self.sink.write(&text);
            },
            Command::Clear => self.dispatch(StorefrontAction::ClearBasket).await?,
            Command::Checkout => {
                let (_, (rejection, payment)) = self
                    .store
                    .send_and_read(StorefrontAction::BeginCheckout, |s| {
                        (s.last_error.clone(), s.order.payment)
                    })
                    .await?;
                match rejection {
                    Some(error) => self.report(&error),
                    None => self.sink.write(&format!(
                        "Способ оплаты: {payment}\nДалее: pay <online|cash>, address <адрес>"
                    )),
                }
            },
            Command::Pay(value) => {
                self.dispatch(StorefrontAction::SetDeliveryField {
                    field: DeliveryField::Payment,
                    value,
                })
                .await?;
            },
            Command::Address(value) => {
                self.dispatch(StorefrontAction::SetDeliveryField {
                    field: DeliveryField::Address,
                    value,
                })
                .await?;
            },
            Command::Email(value) => {
                self.dispatch(StorefrontAction::SetContactField {
                    field: ContactField::Email,
                    value,
                })
                .await?;
            },
            Command::Phone(value) => {
                self.dispatch(StorefrontAction::SetContactField {
                    field: ContactField::Phone,
                    value,
                })
                .await?;
            },
            Command::Submit => self.dispatch_and_wait(StorefrontAction::SubmitOrder).await?,
            Command::Help => self.sink.write(HELP),
            Command::Quit => return Ok(Flow::Quit),
        }

        Ok(Flow::Continue)
    }

    /// Sends an action and reports a rejection
    async fn dispatch(&self, action: StorefrontAction) -> Result<(), StoreError> {
        let (_, rejection) = self
            .store
            .send_and_read(action, |s| s.last_error.clone())
            .await?;
        if let Some(error) = rejection {
            self.report(&error);
        }
        Ok(())
    }

    /// Sends an action and waits for its network effects to come back
    ///
    /// A rejection is reported right away. Otherwise the failure actions fed
    /// back by the effects are reported once they have been reduced.
    async fn dispatch_and_wait(&self, action: StorefrontAction) -> Result<(), StoreError> {
        let mut outcomes = self.store.subscribe_actions();
        let (mut handle, (rejection, generation)) = self
            .store
            .send_and_read(action, |s| (s.last_error.clone(), s.catalog_generation))
            .await?;

        if let Some(error) = rejection {
            self.report(&error);
            return Ok(());
        }

        if handle.wait_with_timeout(self.timeout).await.is_err() {
            tracing::warn!(timeout = ?self.timeout, "Effect did not finish in time");
            self.sink.write("Сервер не ответил вовремя");
            return Ok(());
        }

        loop {
            match outcomes.try_recv() {
                Ok(StorefrontAction::OrderFailed { error }) => {
                    self.report(&format!("Order failed: {error}"));
                },
                Ok(StorefrontAction::CatalogFetchFailed {
                    generation: failed,
                    error,
                }) if failed == generation => {
                    self.report(&format!("Failed to load catalog: {error}"));
                },
                Ok(_) | Err(TryRecvError::Lagged(_)) => {},
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        Ok(())
    }

    fn report(&self, error: &str) {
        self.sink.write(&format!("Ошибка: {error}"));
    }

    /// Looks up a product id, then a 1-based catalog position
    async fn resolve(&self, id: ProductId) -> ProductId {
        self.store
            .state(|s: &StorefrontState| {
                if s.product(&id).is_some() {
                    return id.clone();
                }
                id.as_str()
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|index| s.catalog.get(index))
                    .map_or_else(|| id.clone(), |product| product.id.clone())
            })
            .await
    }

    async fn detail(&self, id: &ProductId) {
        match self.api.get_product(id.as_str()).await {
            Ok(remote) => {
                let in_basket = self.store.state(|s| s.in_basket(id)).await;
                self.sink
                    .write(&PreviewView::render_product(&remote.into(), in_basket));
            },
            Err(error) => {
                tracing::error!(%error, %id, "Failed to fetch product");
                self.report(&error.to_string());
            },
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::reducer::{StorefrontEnvironment, StorefrontReducer};
    use crate::views::{BufferSink, mount_all};
    use storefront_api::ApiError;
    use storefront_testing::fixtures::{EXTRA_HOUR, MUTE_BUTTON, product, sample_products};
    use storefront_testing::{MockCatalogApi, test_clock};

    fn session(api: MockCatalogApi) -> (Session, StorefrontStore, Arc<MockCatalogApi>, Arc<BufferSink>) {
        let api = Arc::new(api);
        let env = StorefrontEnvironment::new(api.clone(), Arc::new(test_clock()));
        let store = StorefrontStore::new(StorefrontState::new(), StorefrontReducer::new(), env);
        let buffer = Arc::new(BufferSink::new());
        let sink: Arc<dyn Sink> = buffer.clone();
        mount_all(store.events(), &sink);

        let session = Session::new(store.clone(), api.clone(), sink)
            .with_timeout(Duration::from_secs(2));
        (session, store, api, buffer)
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!("catalog".parse(), Ok(Command::Catalog));
        assert_eq!("  BASKET ".parse(), Ok(Command::Basket));
        assert_eq!("submit".parse(), Ok(Command::Submit));
        assert_eq!("q".parse(), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_id_commands() {
        assert_eq!("add p1".parse(), Ok(Command::Add(ProductId::new("p1"))));
        assert_eq!("toggle 3".parse(), Ok(Command::Toggle(ProductId::new("3"))));
        assert_eq!(
            "show".parse::<Command>(),
            Err(CommandError::MissingArgument {
                command: "show",
                argument: "id",
            })
        );
    }

    #[test]
    fn test_parse_text_arguments_keep_spaces() {
        assert_eq!(
            "address  Spb, Vosstania 1 ".parse(),
            Ok(Command::Address("Spb, Vosstania 1".to_string()))
        );
        assert_eq!("email".parse(), Ok(Command::Email(String::new())));
        assert_eq!("pay card".parse(), Ok(Command::Pay("card".to_string())));
        assert!("pay".parse::<Command>().is_err());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Command>(), Err(CommandError::Empty));
        assert_eq!(
            "buy p1".parse::<Command>(),
            Err(CommandError::Unknown("buy".to_string()))
        );
    }

    #[tokio::test]
    async fn test_reload_renders_catalog() {
        let (session, store, api, buffer) = session(MockCatalogApi::new(sample_products()));

        let flow = session.execute(Command::Reload).await.unwrap();

        assert_eq!(flow, Flow::Continue);
        assert_eq!(api.list_calls(), 1);
        assert_eq!(store.state(|s| s.catalog.len()).await, 4);
        assert!(buffer.contents().starts_with("Каталог:"));
    }

    #[tokio::test]
    async fn test_positions_resolve_to_catalog_ids() {
        let (session, store, _api, buffer) = session(MockCatalogApi::new(sample_products()));
        session.execute(Command::Reload).await.unwrap();
        buffer.take();

        session.execute("add 1".parse().unwrap()).await.unwrap();

        assert!(store.state(|s| s.in_basket(&ProductId::new(EXTRA_HOUR))).await);
        assert!(buffer.contents().contains("[Корзина: 1]"));
    }

    #[tokio::test]
    async fn test_rejection_is_reported() {
        let (session, _store, _api, buffer) = session(MockCatalogApi::new(sample_products()));
        session.execute(Command::Reload).await.unwrap();
        buffer.take();

        session.execute(Command::Add(ProductId::new("missing"))).await.unwrap();

        let blocks = buffer.take();
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].starts_with("Ошибка:"));
    }

    #[tokio::test]
    async fn test_full_checkout() {
        let (session, store, api, buffer) = session(MockCatalogApi::new(sample_products()));
        session.execute(Command::Reload).await.unwrap();

        for line in [
            format!("add {MUTE_BUTTON}"),
            "checkout".to_string(),
            "pay cash".to_string(),
            "address Moscow".to_string(),
            "email a@b.c".to_string(),
            "phone +7 900".to_string(),
            "submit".to_string(),
        ] {
            session.execute(line.parse().unwrap()).await.unwrap();
        }

        let orders = api.orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].total, 2000);
        assert!(buffer.contents().contains("Списано 2000 синапсов"));
        assert!(store.state(|s| s.basket.is_empty()).await);
    }

    #[tokio::test]
    async fn test_quit_and_help() {
        let (session, _store, _api, buffer) = session(MockCatalogApi::default());

        assert_eq!(session.execute(Command::Help).await.unwrap(), Flow::Continue);
        assert_eq!(buffer.take(), vec![HELP.to_string()]);
        assert_eq!(session.execute(Command::Quit).await.unwrap(), Flow::Quit);
    }

    #[tokio::test]
    async fn test_detail_reports_missing_product() {
        let (session, _store, _api, buffer) = session(MockCatalogApi::new(sample_products()));

        session.execute(Command::Detail(ProductId::new("nope"))).await.unwrap();

        assert!(buffer.contents().starts_with("Ошибка:"));
    }

    #[tokio::test]
    async fn test_commands_fail_after_shutdown() {
        let (session, store, _api, _buffer) = session(MockCatalogApi::default());
        store.shutdown(Duration::from_secs(1)).await.unwrap();

        assert_eq!(
            session.execute(Command::Clear).await,
            Err(StoreError::ShutdownInProgress)
        );
    }

    #[tokio::test]
    async fn test_refused_submit_reported_once() {
        let (session, _store, api, buffer) = session(MockCatalogApi::new(sample_products()));

        session.execute(Command::Submit).await.unwrap();

        let blocks = buffer.take();
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].starts_with("Ошибка:"));
        assert!(api.orders().is_empty());
    }

    #[tokio::test]
    async fn test_failed_reload_reported_once() {
        let api = MockCatalogApi::new(sample_products())
            .with_catalog_error(ApiError::RequestFailed("connection refused".to_string()));
        let (session, _store, _api, buffer) = session(api);

        session.execute(Command::Reload).await.unwrap();

        let blocks = buffer.take();
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].starts_with("Ошибка: Failed to load catalog"));
        assert!(blocks[0].contains("connection refused"));
    }

    #[tokio::test]
    async fn test_failed_order_reported_once() {
        let api = MockCatalogApi::new(sample_products())
            .with_order_error(ApiError::Rejected("Неверная сумма заказа".to_string()));
        let (session, _store, _api, buffer) = session(api);
        session.execute(Command::Reload).await.unwrap();

        for line in [
            format!("add {MUTE_BUTTON}"),
            "checkout".to_string(),
            "address Moscow".to_string(),
            "email a@b.c".to_string(),
            "phone +7 900".to_string(),
        ] {
            session.execute(line.parse().unwrap()).await.unwrap();
        }
        buffer.take();

        session.execute(Command::Submit).await.unwrap();

        let blocks = buffer.take();
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].starts_with("Ошибка: Order failed"));
        assert!(blocks[0].contains("Неверная сумма заказа"));
    }

    #[tokio::test]
    async fn test_numeric_id_wins_over_position() {
        let catalog = vec![
            product("7", "Seven", Some(700)),
            product("1", "One", Some(100)),
        ];
        let (session, store, _api, _buffer) = session(MockCatalogApi::new(catalog));
        session.execute(Command::Reload).await.unwrap();

        session.execute("add 1".parse().unwrap()).await.unwrap();
        session.execute("add 2".parse().unwrap()).await.unwrap();

        let basket: Vec<String> = store
            .state(|s| s.basket.iter().map(|p| p.id.to_string()).collect())
            .await;
        assert_eq!(basket, vec!["1".to_string()]);
    }
}
