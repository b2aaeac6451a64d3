pub mod revert;

pub use revert::{decode_revert, RevertReason};

use alloy::sol;

// DSCEngine: collateral accounting, health factor and liquidation
sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    #[derive(Debug)]
    interface DSCEngine {
        error DSCEngine__NeedsMoreThanZero();
        error DSCEngine__TokenAddressesAndPriceFeedAddressesAmountsDontMatch();
        error DSCEngine__NotAllowedToken();
        error DSCEngine__TransferFailed();
        error DSCEngine__BreaksHealthFactor(uint256 healthFactorValue);
        error DSCEngine__MintFailed();
        error DSCEngine__HealthFactorOk();
        error DSCEngine__HealthFactorNotImproved();

        function depositCollateralAndMintDsc(
            address tokenCollateralAddress,
            uint256 amountCollateral,
            uint256 amountDscToMint
        ) external;
        function depositCollateral(address tokenCollateralAddress, uint256 amountCollateral) external;
        function redeemCollateralForDsc(
            address tokenCollateralAddress,
            uint256 amountCollateral,
            uint256 amountDscToBurn
        ) external;
        function redeemCollateral(address tokenCollateralAddress, uint256 amountCollateral) external;
        function mintDsc(uint256 amountDscToMint) external;
        function burnDsc(uint256 amount) external;
        function liquidate(address collateral, address user, uint256 debtToCover) external;

        function getHealthFactor(address user) external view returns (uint256);
        function getAccountInformation(address user)
            external
            view
            returns (uint256 totalDscMinted, uint256 collateralValueInUsd);
        function getUsdValue(address token, uint256 amount) external view returns (uint256);
        function getCollateralBalanceOfUser(address user, address token) external view returns (uint256);
        function getAccountCollateralValue(address user) external view returns (uint256);
        function getTokenAmountFromUsd(address token, uint256 usdAmountInWei) external view returns (uint256);
        function getLiquidationBonus() external pure returns (uint256);
        function getLiquidationPrecision() external pure returns (uint256);
        function getMinHealthFactor() external pure returns (uint256);
        function getCollateralTokens() external view returns (address[] memory);
    }
}

// DecentralizedStableCoin: ERC-20 burnable, owned by the engine
sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    #[derive(Debug)]
    interface DecentralizedStableCoin {
        error DecentralizedStableCoin__AmountMustBeMoreThanZero();
        error DecentralizedStableCoin__BurnAmountExceedsBalance();
        error DecentralizedStableCoin__NotZeroAddress();

        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

// Wrapped native currency used as collateral
sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    #[derive(Debug)]
    interface WrappedNative {
        function deposit() external payable;
        function withdraw(uint256 wad) external;
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

// OpenZeppelin v5 ERC-20 custom errors
sol! {
    #[allow(missing_docs)]
    #[derive(Debug)]
    interface ERC20Errors {
        error ERC20InsufficientBalance(address sender, uint256 balance, uint256 needed);
        error ERC20InsufficientAllowance(address spender, uint256 allowance, uint256 needed);
    }
}
