pub mod aliases {
    pub type MaybeOwnedString = ::std::borrow::Cow<'static, str>;
}
