pub mod category;
pub mod color;
pub mod favorite;
pub mod order;
pub mod order_item;
pub mod product;
pub mod product_category;
pub mod product_specification;
pub mod product_variant;
pub mod promo;
pub mod promo_product;
pub mod review;
pub mod size;
pub mod tech_type;
pub mod user;

// Re-export entities
pub use category::{Entity as Category, Model as CategoryModel};
pub use color::{Entity as Color, Model as ColorModel};
pub use favorite::{Entity as Favorite, Model as FavoriteModel};
pub use order::{Entity as Order, Model as OrderModel, OrderStatus, PaymentMethod};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
pub use product::{Entity as Product, Model as ProductModel};
pub use product_category::{Entity as ProductCategory, Model as ProductCategoryModel};
pub use product_specification::{Entity as ProductSpecification, Model as ProductSpecificationModel};
pub use product_variant::{Entity as ProductVariant, Model as ProductVariantModel};
pub use promo::{Entity as Promo, Model as PromoModel};
pub use promo_product::{Entity as PromoProduct, Model as PromoProductModel};
pub use review::{Entity as Review, Model as ReviewModel};
pub use size::{Entity as Size, Model as SizeModel};
pub use tech_type::{Entity as TechType, Model as TechTypeModel};
pub use user::{Entity as User, Model as UserModel};
