//! Turns product and access-state events into [`MessageContent`].

use chrono::{DateTime, Utc};
use stockwatch_core::{DisplaySettings, Locale, ProductSnapshot, StorefrontOrigin};

use crate::content::{ActionLink, ActionRow, MessageContent, MessageField};

const GREEN: u32 = 0x002e_cc71;
const RED: u32 = 0x00e7_4c3c;
const GREY: u32 = 0x0095_a5a6;
const AMBER: u32 = 0x00f3_9c12;

/// Variants that get add-to-cart links.
const CART_VARIANTS: usize = 2;
const CART_QUANTITIES: [u32; 3] = [1, 2, 4];

const MAX_TITLE: usize = 256;
const MAX_LABEL: usize = 80;
const MAX_FIELD_VALUE: usize = 1024;
const MAX_DESCRIPTION: usize = 4096;

/// Why a product message is being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductEvent {
    /// First notification for the product.
    New,
    /// Unavailable → available with a message already on file.
    Restock,
    SoldOut,
    /// Content changed without an availability flip.
    Update,
    /// Gone from the catalog; carries the last known availability.
    Removed { was_available: bool },
    /// Re-render of an existing message with unchanged semantics.
    Refresh,
}

struct Labels {
    status: &'static str,
    price: &'static str,
    published: &'static str,
    checked: &'static str,
    new: &'static str,
    restock: &'static str,
    in_stock: &'static str,
    sold_out: &'static str,
    updated: &'static str,
    removed: &'static str,
    was_in_stock: &'static str,
    was_sold_out: &'static str,
    access_title: &'static str,
    protected: &'static str,
    open: &'static str,
}

const EN: Labels = Labels {
    status: "Status",
    price: "Price",
    published: "Published",
    checked: "Checked",
    new: "New listing",
    restock: "Back in stock",
    in_stock: "In stock",
    sold_out: "Sold out",
    updated: "Updated",
    removed: "Removed",
    was_in_stock: "was in stock",
    was_sold_out: "was sold out",
    access_title: "Store access",
    protected: "Password protected",
    open: "Open",
};

const NL: Labels = Labels {
    status: "Status",
    price: "Prijs",
    published: "Gepubliceerd",
    checked: "Gecontroleerd",
    new: "Nieuw",
    restock: "Weer op voorraad",
    in_stock: "Op voorraad",
    sold_out: "Uitverkocht",
    updated: "Bijgewerkt",
    removed: "Verwijderd",
    was_in_stock: "was op voorraad",
    was_sold_out: "was uitverkocht",
    access_title: "Winkeltoegang",
    protected: "Met wachtwoord beveiligd",
    open: "Open",
};

#[derive(Debug, Clone, Default)]
pub struct Renderer {
    display: DisplaySettings,
}

impl Renderer {
    #[must_use]
    pub fn new(display: DisplaySettings) -> Self {
        Self { display }
    }

    fn labels(&self) -> &'static Labels {
        match self.display.locale {
            Locale::En => &EN,
            Locale::Nl => &NL,
        }
    }

    /// Renders a product notification.
    ///
    /// Unavailable and removed products get a struck-through title and no
    /// cart links. Available products get one row of cart links
    /// (`origin/cart/{variant}:{qty}`) per available variant among the
    /// first two.
    #[must_use]
    pub fn product(
        &self,
        event: ProductEvent,
        product: &ProductSnapshot,
        origin: &StorefrontOrigin,
        at: DateTime<Utc>,
    ) -> MessageContent {
        let labels = self.labels();
        let removed = matches!(event, ProductEvent::Removed { .. });
        let available = product.is_available() && !removed;

        let title = if removed {
            format!("~~{}~~ ({})", product.title, labels.removed.to_uppercase())
        } else if available {
            product.title.clone()
        } else {
            format!("~~{}~~ ({})", product.title, labels.sold_out.to_uppercase())
        };

        let status = match event {
            ProductEvent::New => labels.new.to_owned(),
            ProductEvent::Restock => labels.restock.to_owned(),
            ProductEvent::SoldOut => labels.sold_out.to_owned(),
            ProductEvent::Removed { was_available } => format!(
                "{} ({})",
                labels.removed,
                if was_available {
                    labels.was_in_stock
                } else {
                    labels.was_sold_out
                }
            ),
            ProductEvent::Update | ProductEvent::Refresh => {
                let current = if available {
                    labels.in_stock
                } else {
                    labels.sold_out
                };
                if event == ProductEvent::Update {
                    format!("{current} · {}", labels.updated)
                } else {
                    current.to_owned()
                }
            }
        };

        let mut fields = vec![MessageField::inline(labels.status, status)];
        if let Some(price) = product.display_price() {
            fields.push(MessageField::inline(
                labels.price,
                self.display.format_price(price),
            ));
        }
        if let Some(published) = product.published_at {
            fields.push(MessageField::inline(
                labels.published,
                self.display.format_timestamp(published),
            ));
        }
        fields.push(MessageField::inline(
            labels.checked,
            self.display.format_timestamp(at),
        ));

        let actions = if available {
            self.cart_rows(product, origin)
        } else {
            Vec::new()
        };

        MessageContent {
            title: truncate(&title, MAX_TITLE),
            url: product.product_url(origin),
            thumbnail: product.thumbnail().map(str::to_owned),
            description: (!product.description.is_empty())
                .then(|| truncate(&product.description, MAX_DESCRIPTION)),
            color: if removed {
                GREY
            } else if available {
                GREEN
            } else {
                RED
            },
            footer: origin.to_string(),
            fields: fields
                .into_iter()
                .map(|f| MessageField {
                    value: truncate(&f.value, MAX_FIELD_VALUE),
                    ..f
                })
                .collect(),
            actions,
        }
    }

    /// Renders the access-state notification for an origin.
    #[must_use]
    pub fn access(
        &self,
        protected: bool,
        origin: &StorefrontOrigin,
        checked_at: DateTime<Utc>,
    ) -> MessageContent {
        let labels = self.labels();
        let state = if protected {
            labels.protected
        } else {
            labels.open
        };
        MessageContent {
            title: format!("{}: {}", labels.access_title, origin.host()),
            url: origin.join("/"),
            thumbnail: None,
            description: None,
            color: if protected { AMBER } else { GREEN },
            footer: origin.to_string(),
            fields: vec![
                MessageField::inline(labels.status, state),
                MessageField::inline(labels.checked, self.display.format_timestamp(checked_at)),
            ],
            actions: Vec::new(),
        }
    }

    fn cart_rows(&self, product: &ProductSnapshot, origin: &StorefrontOrigin) -> Vec<ActionRow> {
        product
            .variants
            .iter()
            .take(CART_VARIANTS)
            .filter(|v| v.available)
            .map(|variant| ActionRow {
                links: CART_QUANTITIES
                    .iter()
                    .map(|qty| ActionLink {
                        label: truncate(
                            &format!(
                                "{} ({qty}x {})",
                                variant.title,
                                self.display.format_price(&variant.price)
                            ),
                            MAX_LABEL,
                        ),
                        url: origin.join(&format!("/cart/{}:{qty}", variant.id)),
                    })
                    .collect(),
            })
            .collect()
    }
}

/// Truncates to at most `max` characters, marking the cut with `…`.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_owned();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
