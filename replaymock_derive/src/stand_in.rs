// vim: tw=80
use proc_macro2::{Span, TokenStream};
use quote::{ToTokens, format_ident, quote};
use syn::{
    Token,
    braced,
    parse::{Parse, ParseStream},
    spanned::Spanned,
};

use crate::compile_error;

/// How a method takes `self`
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Receiver {
    Ref,
    Mut,
}

/// One method argument
struct Arg {
    /// Name used inside generated code
    ident: syn::Ident,
    /// Type as written in the signature
    ty: syn::Type,
    /// Is this a `&T` argument?  Those are captured with `ToOwned`.
    borrowed: bool,
}

impl Arg {
    /// Expression that captures this argument into an `Arguments` list
    fn capture(&self) -> TokenStream {
        let ident = &self.ident;
        if self.borrowed {
            quote!(::std::borrow::ToOwned::to_owned(#ident))
        } else {
            quote!(#ident)
        }
    }
}

/// A validated method declaration
struct Method {
    attrs: Vec<syn::Attribute>,
    ident: syn::Ident,
    receiver: Receiver,
    args: Vec<Arg>,
    output: syn::Type,
}

impl Method {
    fn from_decl(decl: &syn::TraitItemFn) -> syn::Result<Self> {
        let sig = &decl.sig;
        if let Some(block) = &decl.default {
            return Err(compile_error(block.span(),
                "Stand-in methods must not have a body"));
        }
        if let Some(asyncness) = &sig.asyncness {
            return Err(compile_error(asyncness.span(),
                "async methods are not supported"));
        }
        if !sig.generics.params.is_empty() ||
            sig.generics.where_clause.is_some()
        {
            return Err(compile_error(sig.generics.span(),
                "generic methods are not supported"));
        }
        let receiver = match sig.receiver() {
            Some(r) if r.colon_token.is_some() => {
                return Err(compile_error(r.span(),
                    "only &self and &mut self receivers are supported"));
            },
            Some(r) if r.reference.is_none() => {
                return Err(compile_error(r.span(),
                    "methods taking self by value are not supported"));
            },
            Some(r) if r.mutability.is_some() => Receiver::Mut,
            Some(_) => Receiver::Ref,
            None => {
                return Err(compile_error(sig.ident.span(),
                    "methods without a self receiver are not supported"));
            }
        };
        let mut args = Vec::new();
        for (i, fa) in sig.inputs.iter().enumerate() {
            let syn::FnArg::Typed(pt) = fa else {
                continue;
            };
            let ident = format_ident!("__arg{}", i);
            let (ty, borrowed) = match &*pt.ty {
                syn::Type::Reference(r) if r.mutability.is_some() => {
                    return Err(compile_error(r.span(),
                        "&mut arguments are not supported"));
                },
                syn::Type::Reference(_) => ((*pt.ty).clone(), true),
                syn::Type::ImplTrait(it) => {
                    return Err(compile_error(it.span(),
                        "impl Trait arguments are not supported"));
                },
                ty => (ty.clone(), false)
            };
            args.push(Arg{ident, ty, borrowed});
        }
        let output = match &sig.output {
            syn::ReturnType::Default => syn::parse_quote!(()),
            syn::ReturnType::Type(_, ty) => match &**ty {
                syn::Type::Reference(r) => {
                    return Err(compile_error(r.span(),
                        "methods returning references are not supported"));
                },
                syn::Type::ImplTrait(it) => {
                    return Err(compile_error(it.span(),
                        "impl Trait return types are not supported"));
                },
                ty => ty.clone()
            }
        };
        Ok(Method {
            attrs: decl.attrs.clone(),
            ident: sig.ident.clone(),
            receiver,
            args,
            output
        })
    }

    /// The method's parameter list, with generated argument names
    fn params(&self) -> TokenStream {
        let receiver = match self.receiver {
            Receiver::Ref => quote!(&self),
            Receiver::Mut => quote!(&mut self),
        };
        let args = self.args.iter().map(|a| {
            let ident = &a.ident;
            let ty = &a.ty;
            quote!(#ident: #ty)
        });
        quote!(#receiver, #(#args),*)
    }

    /// Statements that capture every argument into `__args`
    fn capture_args(&self) -> TokenStream {
        let pushes = self.args.iter().map(|a| {
            let capture = a.capture();
            quote!(__args.push(#capture);)
        });
        quote!(
            #[allow(unused_mut)]
            let mut __args = ::replaymock::Arguments::new();
            #(#pushes)*
        )
    }

    /// Statements that read delegated arguments back, shadowing the owned
    /// ones.  Borrowed arguments are still available by reference.
    fn unpack_args(&self) -> TokenStream {
        let reads = self.args.iter().map(|a| {
            let ident = &a.ident;
            let ty = &a.ty;
            if a.borrowed {
                quote!(__reader.skip();)
            } else {
                quote!(
                    let #ident = ::replaymock::__private::unpack::<#ty>(
                        &__sig, &mut __reader);
                )
            }
        });
        quote!(
            #[allow(unused_mut, unused_variables)]
            let mut __reader = __args.reader();
            #(#reads)*
        )
    }

    fn arg_idents(&self) -> impl Iterator<Item=&syn::Ident> {
        self.args.iter().map(|a| &a.ident)
    }
}

/// An `impl Trait for Name` block
struct TraitImpl {
    attrs: Vec<syn::Attribute>,
    /// Set by `#[no_base]`: the base type doesn't implement this trait
    no_base: bool,
    path: syn::Path,
    methods: Vec<Method>,
}

impl TraitImpl {
    fn short_ident(&self) -> &syn::Ident {
        // syn guarantees at least one segment
        &self.path.segments.last().unwrap().ident
    }

    fn type_info(&self) -> TokenStream {
        let path = &self.path;
        quote!(::replaymock::TypeInfo::interface::<dyn #path>())
    }
}

pub(crate) struct StandIn {
    attrs: Vec<syn::Attribute>,
    vis: syn::Visibility,
    name: syn::Ident,
    base: Option<syn::Path>,
    /// The base type's inherent methods.  They are never intercepted.
    methods: Vec<Method>,
    impls: Vec<TraitImpl>,
}

impl StandIn {
    fn mock_ident(&self) -> syn::Ident {
        format_ident!("Mock{}", self.name)
    }

    fn sig_ident(trait_: &TraitImpl, method: &Method) -> syn::Ident {
        format_ident!("__sig_{}_{}", trait_.short_ident(), method.ident)
    }

    /// Is a real implementation available for this trait's methods?
    fn delegates(&self, trait_: &TraitImpl) -> bool {
        self.base.is_some() && !trait_.no_base
    }

    fn gen_struct(&self) -> TokenStream {
        let attrs = &self.attrs;
        let vis = &self.vis;
        let mock = self.mock_ident();
        let base_field = self.base.as_ref().map(|base| quote!(__base: #base,));
        let docstr = format!("Stand-in for `{}`", self.name);
        quote!(
            #[doc = #docstr]
            #(#attrs)*
            #[allow(dead_code)]
            #vis struct #mock {
                __binding: ::replaymock::Binding,
                #base_field
            }

            impl ::std::fmt::Debug for #mock {
                fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>)
                    -> ::std::fmt::Result
                {
                    f.debug_struct(stringify!(#mock))
                        .field("binding", &self.__binding)
                        .finish()
                }
            }
        )
    }

    fn gen_stand_in_impl(&self) -> TokenStream {
        let mock = self.mock_ident();
        let mut interfaces = self.impls.iter()
            .map(TraitImpl::type_info)
            .collect::<Vec<_>>();
        let (target, generate) = match &self.base {
            Some(base) => (
                quote!(::replaymock::TypeInfo::class::<#base>()),
                quote!(
                    let __base = ::replaymock::__private::construct::<#base>(
                        constructor_args)?;
                    Ok(#mock{__binding: binding, __base})
                )
            ),
            None => (
                interfaces.remove(0),
                quote!(
                    // Traits have no constructor to forward these to
                    let _ = constructor_args;
                    Ok(#mock{__binding: binding})
                )
            )
        };
        quote!(
            impl ::replaymock::StandIn for #mock {
                fn target() -> ::replaymock::TypeInfo {
                    #target
                }

                fn interfaces() -> ::std::vec::Vec<::replaymock::TypeInfo> {
                    vec![#(#interfaces),*]
                }

                fn generate(binding: ::replaymock::Binding,
                            constructor_args: ::replaymock::Arguments)
                    -> ::std::result::Result<Self, ::replaymock::MockError>
                {
                    #generate
                }

                fn binding(&self) -> &::replaymock::Binding {
                    &self.__binding
                }
            }
        )
    }

    /// Signature constructors, expect_* methods and inherent passthroughs
    fn gen_inherent_impl(&self) -> TokenStream {
        let mock = self.mock_ident();
        let vis = &self.vis;
        let mut body = TokenStream::new();
        for trait_ in self.impls.iter() {
            let owner = trait_.type_info();
            let has_base = self.delegates(trait_);
            for method in trait_.methods.iter() {
                let sig_ident = Self::sig_ident(trait_, method);
                let name = method.ident.to_string();
                let output = &method.output;
                let expect_ident = format_ident!("expect_{}", method.ident);
                let args = method.args.iter().map(|a| {
                    let ident = &a.ident;
                    let ty = &a.ty;
                    quote!(#ident: #ty)
                });
                let capture = method.capture_args();
                let docstr = format!("Expect a call to `{}::{}`",
                    trait_.short_ident(), method.ident);
                quote!(
                    #[allow(non_snake_case)]
                    #[doc(hidden)]
                    fn #sig_ident() -> ::replaymock::Signature {
                        #[allow(unused_imports)]
                        use ::replaymock::__private::{
                            NoDefault as _, ViaDefault as _
                        };
                        let default_fn = (&::replaymock::__private
                            ::DefaultReturner::<#output>::new()).default_fn();
                        ::replaymock::Signature::new(#owner, #name)
                            .returning::<#output>(default_fn)
                            .with_base(#has_base)
                    }

                    #[doc = #docstr]
                    #vis fn #expect_ident(&self, #(#args),*)
                        -> ::replaymock::ExpectationHandle
                    {
                        #capture
                        self.__binding.expect(Self::#sig_ident(), __args)
                    }
                ).to_tokens(&mut body);
            }
        }
        if let Some(base) = &self.base {
            for method in self.methods.iter() {
                let attrs = &method.attrs;
                let ident = &method.ident;
                let params = method.params();
                let output = &method.output;
                let this = match method.receiver {
                    Receiver::Ref => quote!(&self.__base),
                    Receiver::Mut => quote!(&mut self.__base),
                };
                let args = method.arg_idents();
                quote!(
                    #(#attrs)*
                    #vis fn #ident(#params) -> #output {
                        <#base>::#ident(#this, #(#args),*)
                    }
                ).to_tokens(&mut body);
            }
        }
        quote!(
            #[allow(dead_code)]
            impl #mock { #body }
        )
    }

    fn gen_trait_impl(&self, trait_: &TraitImpl) -> TokenStream {
        let mock = self.mock_ident();
        let attrs = &trait_.attrs;
        let path = &trait_.path;
        let mut body = TokenStream::new();
        for method in trait_.methods.iter() {
            let meth_attrs = &method.attrs;
            let ident = &method.ident;
            let params = method.params();
            let output = &method.output;
            let sig_ident = Self::sig_ident(trait_, method);
            let capture = method.capture_args();
            let delegate = match &self.base {
                Some(base) if !trait_.no_base => {
                    let unpack = method.unpack_args();
                    let this = match method.receiver {
                        Receiver::Ref => quote!(&self.__base),
                        Receiver::Mut => quote!(&mut self.__base),
                    };
                    let args = method.arg_idents();
                    quote!(
                        #unpack
                        <#base as #path>::#ident(#this, #(#args),*)
                    )
                },
                _ => quote!(
                    let _ = __args;
                    ::replaymock::__private::no_base(&__sig)
                )
            };
            quote!(
                #(#meth_attrs)*
                fn #ident(#params) -> #output {
                    let __sig = Self::#sig_ident();
                    #capture
                    match ::replaymock::__private::dispatch(&self.__binding,
                        &__sig, __args)
                    {
                        ::replaymock::CallOutcome::Return(__value) => {
                            ::replaymock::__private::downcast_return::<#output>(
                                &__sig, __value)
                        },
                        ::replaymock::CallOutcome::Throw(__payload) => {
                            ::std::panic::resume_unwind(__payload)
                        },
                        ::replaymock::CallOutcome::Delegate(__args) => {
                            #delegate
                        }
                    }
                }
            ).to_tokens(&mut body);
        }
        quote!(
            #(#attrs)*
            impl #path for #mock {
                #body
            }
        )
    }

    fn gen(&self) -> TokenStream {
        let mut output = TokenStream::new();
        self.gen_struct().to_tokens(&mut output);
        self.gen_stand_in_impl().to_tokens(&mut output);
        self.gen_inherent_impl().to_tokens(&mut output);
        for trait_ in self.impls.iter() {
            self.gen_trait_impl(trait_).to_tokens(&mut output);
        }
        output
    }
}

/// Parse the contents of a braced list of method declarations
fn parse_methods(input: ParseStream) -> syn::Result<Vec<Method>> {
    let content;
    let _brace_token = braced!(content in input);
    let mut methods = Vec::new();
    while !content.is_empty() {
        let item: syn::TraitItem = content.parse()?;
        match &item {
            syn::TraitItem::Fn(decl) => methods.push(Method::from_decl(decl)?),
            _ => {
                return Err(compile_error(item.span(),
                    "Only methods may appear in a stand-in"));
            }
        }
    }
    Ok(methods)
}

impl Parse for StandIn {
    fn parse(input: ParseStream) -> syn::parse::Result<Self> {
        let attrs = input.call(syn::Attribute::parse_outer)?;
        let vis: syn::Visibility = input.parse()?;
        let name: syn::Ident = input.parse()?;
        let base = if input.peek(Token![:]) {
            input.parse::<Token![:]>()?;
            Some(input.parse::<syn::Path>()?)
        } else {
            None
        };
        let methods = parse_methods(input)?;
        if base.is_none() {
            if let Some(m) = methods.first() {
                return Err(compile_error(m.ident.span(),
                    "Inherent methods need a base type to delegate to"));
            }
        }

        let mut impls: Vec<TraitImpl> = Vec::new();
        while !input.is_empty() {
            let mut attrs = input.call(syn::Attribute::parse_outer)?;
            let before = attrs.len();
            attrs.retain(|a| !a.path().is_ident("no_base"));
            let no_base = attrs.len() != before;
            input.parse::<Token![impl]>()?;
            let path: syn::Path = input.parse()?;
            input.parse::<Token![for]>()?;
            let self_ident: syn::Ident = input.parse()?;
            if self_ident != name {
                return Err(compile_error(self_ident.span(),
                    "impl blocks must be for the stand-in's own name"));
            }
            let methods = parse_methods(input)?;
            for m in methods.iter() {
                let dup = impls.iter()
                    .flat_map(|i| i.methods.iter())
                    .any(|other| other.ident == m.ident);
                if dup {
                    return Err(compile_error(m.ident.span(),
                        "A method of this name is already declared by \
                         another trait"));
                }
            }
            impls.push(TraitImpl{attrs, no_base, path, methods});
        }
        if base.is_none() && impls.is_empty() {
            return Err(compile_error(Span::call_site(),
                "A stand-in needs a base type or at least one trait"));
        }

        Ok(StandIn{attrs, vis, name, base, methods, impls})
    }
}

pub(crate) fn do_stand_in(input: TokenStream) -> TokenStream {
    let stand_in: StandIn = match syn::parse2(input) {
        Ok(stand_in) => stand_in,
        Err(err) => {
            return err.to_compile_error();
        }
    };
    stand_in.gen()
}
