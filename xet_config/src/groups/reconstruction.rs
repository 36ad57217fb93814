crate::config_group!("reconstruction" => {

    /// When set, each downloaded term is rehashed after extraction and the
    /// digest logged, so corrupted transfers show up near their source.
    ///
    /// Override with `XET_RECONSTRUCTION_VERIFY_TERMS`.
    ref verify_terms: bool = false;
});
